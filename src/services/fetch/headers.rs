//! Browser-identity header generator.
//!
//! A catalog of plausible browser identities, sampled per request or stuck to
//! one identity per host for the session, with the matching `Sec-Fetch-*`
//! metadata headers.

use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct BrowserIdentity {
    pub user_agent: &'static str,
    pub sec_ch_ua: &'static str,
    pub sec_ch_ua_platform: &'static str,
    pub accept_language: &'static str,
}

const IDENTITIES: &[BrowserIdentity] = &[
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        sec_ch_ua: "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
        sec_ch_ua_platform: "\"Windows\"",
        accept_language: "en-US,en;q=0.9",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        sec_ch_ua: "",
        sec_ch_ua_platform: "\"macOS\"",
        accept_language: "en-US,en;q=0.9",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        sec_ch_ua: "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
        sec_ch_ua_platform: "\"Linux\"",
        accept_language: "en-US,en;q=0.8",
    },
    BrowserIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        sec_ch_ua: "",
        sec_ch_ua_platform: "\"Windows\"",
        accept_language: "en-US,en;q=0.5",
    },
];

/// Picks one identity uniformly per request, or sticks to the same identity
/// for a given host across the process lifetime (a session look).
pub struct HeaderGenerator {
    sticky: bool,
    per_host: RwLock<HashMap<String, usize>>,
}

impl HeaderGenerator {
    pub fn new(sticky: bool) -> Self {
        Self {
            sticky,
            per_host: RwLock::new(HashMap::new()),
        }
    }

    fn identity_for(&self, host: &str) -> &'static BrowserIdentity {
        if !self.sticky {
            let idx = rand::random::<usize>() % IDENTITIES.len();
            return &IDENTITIES[idx];
        }

        if let Some(&idx) = self.per_host.read().unwrap().get(host) {
            return &IDENTITIES[idx];
        }

        let idx = rand::random::<usize>() % IDENTITIES.len();
        self.per_host.write().unwrap().insert(host.to_string(), idx);
        &IDENTITIES[idx]
    }

    pub fn headers_for(&self, host: &str) -> HeaderMap {
        let identity = self.identity_for(host);
        let mut headers = HeaderMap::new();

        headers.insert("User-Agent", HeaderValue::from_static(identity.user_agent));
        headers.insert("Accept-Language", HeaderValue::from_static(identity.accept_language));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));

        if !identity.sec_ch_ua.is_empty() {
            if let Ok(v) = HeaderValue::from_str(identity.sec_ch_ua) {
                headers.insert("Sec-CH-UA", v);
            }
            headers.insert("Sec-CH-UA-Platform", HeaderValue::from_static(identity.sec_ch_ua_platform));
        }

        headers
    }

    pub fn random_identity() -> &'static BrowserIdentity {
        IDENTITIES.choose(&mut rand::thread_rng()).expect("identity catalog is non-empty")
    }
}
