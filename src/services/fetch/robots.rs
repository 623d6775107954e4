//! robots.txt crawl-delay parsing, cached once per host for the process
//! lifetime.

use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct RobotsCache {
    client: reqwest::Client,
    cache: RwLock<HashMap<String, Option<Duration>>>,
    crawl_delay_pattern: Regex,
}

impl RobotsCache {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
            crawl_delay_pattern: Regex::new(r"(?im)^\s*crawl-delay:\s*([0-9.]+)\s*$")
                .expect("static crawl-delay pattern is valid"),
        }
    }

    /// Returns the crawl delay for `host`, fetching and caching robots.txt on
    /// first use. `None` means no delay was published (or robots.txt could
    /// not be fetched), leaving the caller's own default in force.
    pub async fn crawl_delay(&self, host: &str) -> Option<Duration> {
        if let Some(cached) = self.cache.read().await.get(host) {
            return *cached;
        }

        let delay = self.fetch_crawl_delay(host).await;
        self.cache.write().await.insert(host.to_string(), delay);
        delay
    }

    async fn fetch_crawl_delay(&self, host: &str) -> Option<Duration> {
        let url = format!("https://{host}/robots.txt");
        let body = self.client.get(&url).send().await.ok()?.text().await.ok()?;
        self.parse_crawl_delay(&body)
    }

    fn parse_crawl_delay(&self, body: &str) -> Option<Duration> {
        self.crawl_delay_pattern
            .captures(body)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> RobotsCache {
        RobotsCache::new(reqwest::Client::new())
    }

    #[test]
    fn parses_crawl_delay_directive() {
        let body = "User-agent: *\nCrawl-delay: 3.5\nDisallow: /private\n";
        assert_eq!(cache().parse_crawl_delay(body), Some(Duration::from_secs_f64(3.5)));
    }

    #[test]
    fn missing_directive_returns_none() {
        let body = "User-agent: *\nDisallow: /private\n";
        assert_eq!(cache().parse_crawl_delay(body), None);
    }
}
