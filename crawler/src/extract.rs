use anyhow::{anyhow, Result};
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Serialize;

/// Document record written by the crawler and read by the indexer.
#[derive(Debug, Serialize, PartialEq)]
pub struct StoredDoc {
    pub url: String,
    pub title: String,
    pub text: String,
    pub score: i64,
    pub fetched_at: String,
}

#[derive(Debug)]
pub struct Page {
    pub title: String,
    pub text: String,
    pub score: i64,
    pub links: Vec<Url>,
}

#[derive(Clone)]
pub struct Extractor {
    title: Selector,
    text: Selector,
    score: Option<Selector>,
    link: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e:?}"))
}

impl Extractor {
    pub fn new(text_selector: &str, score_selector: Option<&str>) -> Result<Self> {
        Ok(Self {
            title: selector("title")?,
            text: selector(text_selector)?,
            score: score_selector.map(selector).transpose()?,
            link: selector("a")?,
        })
    }

    pub fn extract(&self, base: &Url, html: &str) -> Page {
        let doc = Html::parse_document(html);
        let collect = |sel: &Selector| doc.select(sel).next().map(|n| n.text().collect::<String>()).unwrap_or_default();
        let title = collect(&self.title).trim().to_string();
        let text = collect(&self.text).split_whitespace().collect::<Vec<_>>().join(" ");
        let score = self.score.as_ref().and_then(|sel| first_integer(&collect(sel))).unwrap_or(0);
        let links = doc
            .select(&self.link)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|h| Url::parse(h).or_else(|_| base.join(h)).ok())
            .filter(|u| u.scheme().starts_with("http"))
            .collect();
        Page { title, text, score, links }
    }
}

/// First (optionally negative) integer in `s`, ignoring thousands separators.
pub fn first_integer(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let negative = cleaned[..start].ends_with('-');
    let digits: String = cleaned[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}
