use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use engine::analysis::query_terms;
use engine::{DocId, Error as EngineError, PageLink, SearchResults, Searcher, SnippetTerm};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    And,
    Or,
    #[default]
    Bm25,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}
fn default_page() -> usize { 1 }
fn default_page_size() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub took_s: f64,
    pub total_hits: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub pages: Vec<PageLink>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub snippet_terms: Vec<SnippetTerm>,
}

#[derive(Clone)]
pub struct AppState {
    pub searcher: Arc<Searcher>,
}

/// Engine failures rendered as HTTP errors.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self { ApiError(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            EngineError::MissingDocument(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Router over an already opened index.
pub fn build_app(searcher: Arc<Searcher>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { searcher })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let searcher = &state.searcher;
    let terms = query_terms(&params.q);
    let results = match params.mode {
        SearchMode::And => SearchResults::unranked(searcher.search_and(&terms)?),
        SearchMode::Or => searcher.search_or(&terms)?,
        SearchMode::Bm25 => searcher.search_bm25(&terms)?,
    };

    let page_size = params.page_size.clamp(1, MAX_PAGE_SIZE);
    let pagination = results.pagination(params.page, page_size);
    let mut hits = Vec::new();
    for hit in results.page_hits(pagination.current_page(), page_size) {
        let snippet = searcher.generate_snippet(&terms, hit.doc_id)?;
        hits.push(SearchHit {
            doc_id: hit.doc_id,
            score: hit.score,
            title: searcher.get_title(hit.doc_id)?,
            url: searcher.get_url(hit.doc_id)?,
            snippet: snippet.to_html(),
            snippet_terms: snippet.terms,
        });
    }

    let took_s = start.elapsed().as_secs_f64();
    tracing::info!(query = %params.q, mode = ?params.mode, total_hits = results.total_hits(), took_s, "search");
    Ok(Json(SearchResponse {
        query: params.q,
        mode: params.mode,
        took_s,
        total_hits: results.total_hits(),
        page: pagination.current_page(),
        page_size,
        total_pages: pagination.total_pages(),
        pages: pagination.strip(),
        results: hits,
    }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let searcher = &state.searcher;
    let doc = searcher.get_document(doc_id)?;
    let text = doc.terms.iter().map(|t| t.full_word.as_str()).collect::<Vec<_>>().join(" ");
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "title": doc.title,
        "url": searcher.get_url(doc_id)?,
        "score": doc.score,
        "text": text,
    })))
}
