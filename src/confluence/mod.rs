// Confluence REST client
// Every network operation is single-attempt; the plain variants log and degrade to empty

pub mod extract;
pub mod models;


use std::time::Duration;

use base64::prelude::*;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::config::ConfluenceConfig;

pub use extract::extract_text;
pub use models::{CurrentUser, RawSearchResult};
use models::ContentPage;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const SEARCH_EXPAND: &str = "body.storage,version,space,ancestors";
const DOCUMENT_EXPAND: &str = "body.storage,version,space,ancestors,descendants";

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Invalid wiki URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP error {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Read access to a wiki, as the retrieval pipeline sees it.
///
/// Implementations are fail-soft: an empty result means either "nothing
/// matched" or "the request failed", and callers treat both as no data.
pub trait WikiSource: Send + Sync {
    /// Full-text search, most relevant first.
    fn search(&self, query: &str, limit: usize) -> Vec<RawSearchResult>;

    /// A single content item with its body expanded.
    fn get_document(&self, id: &str) -> Option<RawSearchResult>;

    /// Recently modified content, newest first.
    fn list_recent(&self, limit: usize) -> Vec<RawSearchResult>;
}

#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    base_url: String,
    space_key: Option<String>,
    auth_header: String,
    agent: ureq::Agent,
}

impl ConfluenceClient {
    #[inline]
    pub fn new(config: &ConfluenceConfig) -> Result<Self, WikiError> {
        let base_url = config.base_url().to_string();
        Url::parse(&base_url).map_err(|_| WikiError::InvalidUrl(base_url.clone()))?;

        let credentials = format!("{}:{}", config.username, config.api_token);
        let auth_header = format!("Basic {}", BASE64_STANDARD.encode(credentials));

        Ok(Self {
            base_url,
            space_key: config.space_key.clone(),
            auth_header,
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    pub fn space_key(&self) -> Option<&str> {
        self.space_key.as_deref()
    }

    /// Full-text search; empty on any failure.
    #[inline]
    pub fn search(&self, query: &str, limit: usize) -> Vec<RawSearchResult> {
        self.try_search(query, limit).unwrap_or_else(|e| {
            error!("Error searching Confluence: {}", e);
            Vec::new()
        })
    }

    #[inline]
    pub fn try_search(&self, query: &str, limit: usize) -> Result<Vec<RawSearchResult>, WikiError> {
        let cql = text_query(query, self.space_key.as_deref());
        debug!("Searching Confluence with CQL: {}", cql);
        self.search_cql(&cql, limit)
    }

    /// Single content item with its full body; `None` on any failure.
    #[inline]
    pub fn get_document(&self, id: &str) -> Option<RawSearchResult> {
        self.try_get_document(id)
            .map_err(|e| error!("Error getting page content: {}", e))
            .ok()
    }

    #[inline]
    pub fn try_get_document(&self, id: &str) -> Result<RawSearchResult, WikiError> {
        let mut document: RawSearchResult = self.get_json(
            &format!("/wiki/rest/api/content/{}", id),
            &[("expand", DOCUMENT_EXPAND.to_string())],
        )?;
        self.attach_link_base(std::slice::from_mut(&mut document), None);
        Ok(document)
    }

    /// Most recently modified content; empty on any failure.
    #[inline]
    pub fn list_recent(&self, limit: usize) -> Vec<RawSearchResult> {
        self.try_list_recent(limit).unwrap_or_else(|e| {
            error!("Error getting recent pages: {}", e);
            Vec::new()
        })
    }

    /// The listing endpoint does not order by modification time, so twice the
    /// requested amount is fetched and sorted here.
    #[inline]
    pub fn try_list_recent(&self, limit: usize) -> Result<Vec<RawSearchResult>, WikiError> {
        let mut query = vec![
            ("limit", (limit * 2).to_string()),
            ("expand", SEARCH_EXPAND.to_string()),
        ];
        if let Some(space_key) = &self.space_key {
            query.push(("spaceKey", space_key.clone()));
        }

        let page: ContentPage = self.get_json("/wiki/rest/api/content", &query)?;
        let mut results = self.into_results(page);
        sort_by_recency(&mut results);
        results.truncate(limit);

        debug!("Fetched {} recent pages", results.len());
        Ok(results)
    }

    /// Everything in one space, in the order the API returns it; empty on any failure.
    #[inline]
    pub fn space_content(&self, space_key: &str, limit: usize) -> Vec<RawSearchResult> {
        let cql = format!("space = \"{}\"", escape_cql(space_key));
        self.search_cql(&cql, limit).unwrap_or_else(|e| {
            error!("Error getting space content: {}", e);
            Vec::new()
        })
    }

    #[inline]
    pub fn try_current_user(&self) -> Result<CurrentUser, WikiError> {
        self.get_json("/wiki/rest/api/user/current", &[])
    }

    /// Reachability and credentials check
    #[inline]
    pub fn ping(&self) -> bool {
        match self.try_current_user() {
            Ok(user) => {
                info!(
                    "Confluence connection successful ({})",
                    user.display_name.as_deref().unwrap_or("unknown user")
                );
                true
            }
            Err(e) => {
                error!("Confluence connection failed: {}", e);
                false
            }
        }
    }

    #[inline]
    pub fn extract_text(&self, markup: &str) -> String {
        extract_text(markup)
    }

    fn search_cql(&self, cql: &str, limit: usize) -> Result<Vec<RawSearchResult>, WikiError> {
        let page: ContentPage = self.get_json(
            "/wiki/rest/api/content/search",
            &[
                ("cql", cql.to_string()),
                ("limit", limit.to_string()),
                ("expand", SEARCH_EXPAND.to_string()),
            ],
        )?;
        let results = self.into_results(page);
        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    fn into_results(&self, page: ContentPage) -> Vec<RawSearchResult> {
        let page_base = page.links.and_then(|links| links.base);
        let mut results = page.results;
        self.attach_link_base(&mut results, page_base.as_deref());
        results
    }

    /// Fill in `_links.base` so relative web links can be made absolute
    fn attach_link_base(&self, results: &mut [RawSearchResult], page_base: Option<&str>) {
        let fallback = format!("{}/wiki", self.base_url);
        for result in results {
            let links = result.links.get_or_insert_with(Default::default);
            if links.base.as_deref().is_none_or(str::is_empty) {
                links.base = Some(page_base.unwrap_or(&fallback).to_string());
            }
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WikiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, value);
        }

        let body = match request.call() {
            Ok(mut response) => {
                response
                    .body_mut()
                    .read_to_string()
                    .map_err(|e| WikiError::Transport {
                        url: url.clone(),
                        message: e.to_string(),
                    })?
            }
            Err(ureq::Error::StatusCode(status)) => {
                return Err(WikiError::Status { status, url });
            }
            Err(e) => {
                return Err(WikiError::Transport {
                    url,
                    message: e.to_string(),
                });
            }
        };

        serde_json::from_str(&body).map_err(|e| WikiError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

impl WikiSource for ConfluenceClient {
    #[inline]
    fn search(&self, query: &str, limit: usize) -> Vec<RawSearchResult> {
        Self::search(self, query, limit)
    }

    #[inline]
    fn get_document(&self, id: &str) -> Option<RawSearchResult> {
        Self::get_document(self, id)
    }

    #[inline]
    fn list_recent(&self, limit: usize) -> Vec<RawSearchResult> {
        Self::list_recent(self, limit)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// CQL full-text clause, restricted to one space when configured
fn text_query(query: &str, space_key: Option<&str>) -> String {
    let text = format!("text ~ \"{}\"", escape_cql(query));
    match space_key {
        Some(space_key) => format!("space = \"{}\" AND {}", escape_cql(space_key), text),
        None => text,
    }
}

fn escape_cql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Newest first; stable, so equal or unparsable timestamps keep API order
fn sort_by_recency(results: &mut [RawSearchResult]) {
    results.sort_by(|a, b| b.modified_at().cmp(&a.modified_at()));
}
