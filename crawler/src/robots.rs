use parking_lot::RwLock;
use reqwest::{header, Client, Url};
use std::collections::HashMap;
use std::sync::Arc;

/// Rules of the `*` group of a robots.txt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Robots {
    pub allows: Vec<String>,
    pub disallows: Vec<String>,
    pub crawl_delay_ms: Option<u64>,
}

impl Robots {
    pub fn parse(txt: &str) -> Robots {
        let mut active = false;
        let mut rules = Robots::default();
        for line in txt.lines() {
            let l = line.trim();
            if l.is_empty() || l.starts_with('#') { continue; }
            if let Some((k, v)) = l.split_once(':') {
                let key = k.trim().to_lowercase();
                let val = v.trim();
                match key.as_str() {
                    "user-agent" => { active = val == "*"; }
                    "allow" if active && !val.is_empty() => rules.allows.push(val.to_string()),
                    "disallow" if active && !val.is_empty() => rules.disallows.push(val.to_string()),
                    "crawl-delay" if active => {
                        if let Ok(n) = val.parse::<f64>() { rules.crawl_delay_ms = Some((n * 1000.0) as u64); }
                    }
                    _ => {}
                }
            }
        }
        rules
    }

    /// Longest matching rule wins; Allow wins ties.
    pub fn allows_path(&self, path: &str) -> bool {
        let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(|r| r.len()).max();
        match (longest(&self.allows), longest(&self.disallows)) {
            (Some(a), Some(d)) => a >= d,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

/// robots.txt rules per host, fetched on first use.
#[derive(Clone)]
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    hosts: Arc<RwLock<HashMap<String, Robots>>>,
}

impl RobotsCache {
    pub fn new(client: Client, user_agent: String) -> Self {
        Self { client, user_agent, hosts: Arc::new(RwLock::new(HashMap::new())) }
    }

    async fn rules(&self, url: &Url) -> Option<Robots> {
        let host = url.host_str()?.to_string();
        let cached = self.hosts.read().get(&host).cloned();
        if cached.is_some() {
            return cached;
        }
        let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
        let txt = match self.client.get(&robots_url).header(header::USER_AGENT, &self.user_agent).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        let parsed = Robots::parse(&txt);
        self.hosts.write().insert(host, parsed.clone());
        Some(parsed)
    }

    pub async fn allowed(&self, url: &Url) -> bool {
        match self.rules(url).await {
            Some(rules) => rules.allows_path(url.path()),
            None => false,
        }
    }

    pub fn delay_ms(&self, url: &Url) -> Option<u64> {
        let host = url.host_str()?;
        self.hosts.read().get(host).and_then(|r| r.crawl_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_wildcard_group_applies() {
        let txt = "User-agent: googlebot\nDisallow: /\n\nUser-agent: *\nDisallow: /private\nAllow: /private/ok\nCrawl-delay: 1.5\n";
        let rules = Robots::parse(txt);
        assert_eq!(rules.disallows, vec!["/private".to_string()]);
        assert_eq!(rules.crawl_delay_ms, Some(1500));
        assert!(rules.allows_path("/r/learnprogramming"));
        assert!(!rules.allows_path("/private/secret"));
        assert!(rules.allows_path("/private/ok/page"));
    }

    #[test]
    fn empty_disallow_allows_everything() {
        let rules = Robots::parse("User-agent: *\nDisallow:\n");
        assert!(rules.allows_path("/anything"));
    }
}
