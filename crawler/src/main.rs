mod extract;
mod robots;

use anyhow::{anyhow, Result};
use clap::Parser;
use reqwest::{header, Client, Url};
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

use extract::{Extractor, Page, StoredDoc};
use robots::RobotsCache;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Fetch pages and store one JSON document per page for the indexer")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: String,
    /// Directory receiving one <sha1(url)>.json file per page
    #[arg(long, default_value = "./stored_documents")]
    storage_dir: String,
    /// CSS selector of the element holding the document text
    #[arg(long, default_value = "body")]
    text_selector: String,
    /// CSS selector of an element whose first integer is the document score
    #[arg(long)]
    score_selector: Option<String>,
    /// Maximum number of documents to store
    #[arg(long, default_value_t = 10_000)]
    max_docs: usize,
    /// Maximum pages to crawl per host (politeness)
    #[arg(long, default_value_t = 1_000)]
    max_per_host: usize,
    /// Concurrency (number of workers)
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// Pause between requests to the same host when robots.txt sets no crawl-delay
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,
    /// User-Agent string to use for robots.txt and crawling
    #[arg(long, default_value = "searchengine-bot/0.1")]
    user_agent: String,
    /// Only follow links that remain on the same host as the page
    #[arg(long, default_value_t = true)]
    same_host_only: bool,
}

#[derive(Default)]
struct Seen { urls: HashSet<String>, per_host: HashMap<String, usize> }

impl Seen {
    /// Record `url` as scheduled unless it was seen or its host is at the cap.
    fn admit(&mut self, url: &Url, max_per_host: usize) -> bool {
        if !self.urls.insert(norm(url)) { return false; }
        if let Some(h) = url.host_str() {
            let cnt = self.per_host.entry(h.to_string()).or_insert(0);
            if *cnt >= max_per_host { return false; }
            *cnt += 1;
        }
        true
    }
}

type Fetched = (Url, Option<Page>);

fn norm(u: &Url) -> String { let mut s = u.clone(); s.set_fragment(None); s.to_string() }

fn doc_file_name(url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    format!("{:x}.json", hasher.finalize())
}

fn store_document(dir: &Path, url: &Url, page: &Page) -> Result<PathBuf> {
    let url = norm(url);
    let rec = StoredDoc {
        title: page.title.clone(),
        text: page.text.clone(),
        score: page.score,
        fetched_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        url,
    };
    let path = dir.join(doc_file_name(&rec.url));
    fs::write(&path, serde_json::to_vec(&rec)?)?;
    Ok(path)
}

fn load_seeds(path: &str) -> Result<VecDeque<Url>> {
    let mut frontier = VecDeque::new();
    for line in BufReader::new(File::open(path)?).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') { continue; }
        let u = Url::parse(&s).or_else(|_| Url::parse(&format!("https://{}", s)));
        match u {
            Ok(u) => frontier.push_back(u),
            Err(e) => tracing::warn!(seed = %s, error = %e, "skipping invalid seed"),
        }
    }
    Ok(frontier)
}

async fn fetch(client: Client, robots: RobotsCache, extractor: Extractor, url: Url, default_delay_ms: u64) -> Fetched {
    if !robots.allowed(&url).await {
        tracing::debug!(%url, "disallowed by robots.txt");
        return (url, None);
    }
    sleep(Duration::from_millis(robots.delay_ms(&url).unwrap_or(default_delay_ms))).await;

    let resp = match client.get(url.clone()).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            tracing::warn!(%url, status = %resp.status(), "non-OK status");
            return (url, None);
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "request failed");
            return (url, None);
        }
    };
    if let Some(ct) = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        if !ct.starts_with("text/html") { return (url, None); }
    }
    let bytes = match resp.bytes().await { Ok(b) => b, Err(_) => return (url, None) };
    if bytes.len() > 2 * 1024 * 1024 { return (url, None); }
    let body = String::from_utf8_lossy(&bytes);
    let page = extractor.extract(&url, &body);
    (url, Some(page))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let storage_dir = PathBuf::from(&args.storage_dir);
    fs::create_dir_all(&storage_dir)?;

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let extractor = Extractor::new(&args.text_selector, args.score_selector.as_deref())?;
    let robots = RobotsCache::new(client.clone(), args.user_agent.clone());

    let mut frontier = load_seeds(&args.seeds)?;
    if frontier.is_empty() { return Err(anyhow!("no valid seeds")); }
    tracing::info!(
        seeds = frontier.len(),
        max_docs = args.max_docs,
        concurrency = args.concurrency,
        storage_dir = %storage_dir.display(),
        "crawl started"
    );

    let mut seen = Seen::default();
    let mut stored = 0usize;
    let mut errors = 0usize;
    let mut inflight: Vec<JoinHandle<Fetched>> = Vec::new();

    while stored < args.max_docs && (!frontier.is_empty() || !inflight.is_empty()) {
        while inflight.len() < args.concurrency && stored + inflight.len() < args.max_docs {
            let Some(url) = frontier.pop_front() else { break };
            if !seen.admit(&url, args.max_per_host) { continue; }
            inflight.push(tokio::spawn(fetch(client.clone(), robots.clone(), extractor.clone(), url, args.delay_ms)));
        }
        if inflight.is_empty() { break; }

        // Wait for the oldest worker; the rest keep running.
        let handle = inflight.remove(0);
        let (url, page) = match handle.await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(error = %e, "worker panicked");
                errors += 1;
                continue;
            }
        };
        let Some(page) = page else {
            errors += 1;
            continue;
        };

        for link in &page.links {
            if args.same_host_only && link.host_str() != url.host_str() { continue; }
            frontier.push_back(link.clone());
        }
        match store_document(&storage_dir, &url, &page) {
            Ok(_) => stored += 1,
            Err(e) => {
                tracing::error!(%url, error = %e, "failed to store document");
                errors += 1;
            }
        }
        if (stored + errors) % 100 == 0 {
            tracing::info!(stored, errors, frontier = frontier.len(), "progress");
        }
    }

    tracing::info!(stored, errors, visited = seen.urls.len(), storage_dir = %storage_dir.display(), "crawl done");
    Ok(())
}
