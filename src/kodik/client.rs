use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::debug;

use super::{
    clamp_limit, CatalogSource, PageRequest, DEFAULT_PAGE_LIMIT, DEFAULT_TITLE_LIMIT,
    DEFAULT_XREF_LIMIT,
};
use crate::coerce::coerce_to_i64;
use crate::models::RawPage;

const KODIK_BASE: &str = "https://kodikapi.com";
const ID_LOOKUP_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct KodikClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl KodikClient {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("anicatalog/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .context("Failed to build Kodik HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("KODIK_API_TOKEN").context("KODIK_API_TOKEN not set")?;
        let base_url = env::var("KODIK_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| KODIK_BASE.to_string());
        Self::new(token, base_url)
    }

    fn endpoint_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/{path}?token={}",
            self.base_url,
            urlencoding::encode(&self.token)
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// URL safe to log: the token value is masked.
    fn redacted(&self, url: &str) -> String {
        if self.token.is_empty() {
            return url.to_string();
        }
        url.replace(&*urlencoding::encode(&self.token), "***")
    }

    async fn get_page(&self, url: &str) -> Result<RawPage> {
        let shown = self.redacted(url);
        debug!(url = %shown, "Kodik request");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Kodik request failed: {shown}"))?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .context("Failed to read Kodik response body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Kodik HTTP error (status {}) for {}: {}",
                status,
                shown,
                String::from_utf8_lossy(&bytes)
            ));
        }
        let envelope: ListEnvelope =
            serde_json::from_slice(&bytes).context("Failed to parse Kodik response JSON")?;
        page_from_envelope(envelope)
    }
}

fn page_from_envelope(envelope: ListEnvelope) -> Result<RawPage> {
    if let Some(message) = envelope.error {
        return Err(anyhow!("Kodik API error: {}", message));
    }
    let received = envelope.results.len();
    let results: Vec<_> = envelope
        .results
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(obj) => Some(obj),
            _ => None,
        })
        .collect();
    if results.len() < received {
        debug!(
            skipped = received - results.len(),
            "Skipping non-object entries in Kodik results"
        );
    }
    Ok(RawPage {
        total: u64::try_from(coerce_to_i64(envelope.total.as_ref())).unwrap_or(0),
        next_page: envelope.next_page.filter(|s| !s.is_empty()),
        results,
    })
}

#[async_trait]
impl CatalogSource for KodikClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<RawPage> {
        // Kodik hands out the next page as a ready-made URL.
        if let Some(cursor) = request.cursor.as_deref() {
            if cursor.starts_with("http://") || cursor.starts_with("https://") {
                return self.get_page(cursor).await;
            }
        }

        let filters = &request.filters;
        let mut params = vec![(
            "limit",
            clamp_limit(request.limit, DEFAULT_PAGE_LIMIT).to_string(),
        )];
        if let Some(cursor) = &request.cursor {
            params.push(("next", cursor.clone()));
        }
        if let Some(types) = filters.types.as_ref().filter(|t| !t.is_empty()) {
            params.push(("types", types.clone()));
        }
        if filters.with_episodes {
            params.push(("with_episodes", "true".to_string()));
        }
        if filters.with_material_data {
            params.push(("with_material_data", "true".to_string()));
        }
        let path = match filters.title.as_ref().filter(|t| !t.trim().is_empty()) {
            Some(title) => {
                params.push(("title", title.clone()));
                "search"
            }
            None => "list",
        };
        let url = self.endpoint_url(path, &params);
        self.get_page(&url).await
    }

    async fn list_by_id(&self, id: &str) -> Result<RawPage> {
        let url = self.endpoint_url(
            "list",
            &[
                ("id", id.to_string()),
                ("limit", ID_LOOKUP_LIMIT.to_string()),
                ("with_material_data", "true".to_string()),
            ],
        );
        self.get_page(&url).await
    }

    async fn search_by_id(&self, id: &str) -> Result<RawPage> {
        let url = self.endpoint_url(
            "search",
            &[
                ("id", id.to_string()),
                ("limit", ID_LOOKUP_LIMIT.to_string()),
                ("with_material_data", "true".to_string()),
            ],
        );
        self.get_page(&url).await
    }

    async fn search_by_title(&self, title: &str, limit: usize) -> Result<RawPage> {
        let url = self.endpoint_url(
            "search",
            &[
                ("title", title.to_string()),
                ("limit", clamp_limit(limit, DEFAULT_TITLE_LIMIT).to_string()),
                ("with_material_data", "true".to_string()),
            ],
        );
        self.get_page(&url).await
    }

    async fn search_by_xref(&self, kinopoisk_id: &str, limit: usize) -> Result<RawPage> {
        let url = self.endpoint_url(
            "search",
            &[
                ("kinopoisk_id", kinopoisk_id.to_string()),
                ("limit", clamp_limit(limit, DEFAULT_XREF_LIMIT).to_string()),
                ("with_material_data", "true".to_string()),
            ],
        );
        self.get_page(&url).await
    }
}
