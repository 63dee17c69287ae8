//! In-memory wiki used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::confluence::WikiSource;
use crate::confluence::models::{
    ContentBody, Links, RawSearchResult, SpaceRef, StorageValue, VersionInfo,
};

/// One recorded call against [`FakeWiki`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search(String, usize),
    GetDocument(String),
    ListRecent(usize),
}

#[derive(Default)]
pub struct FakeWiki {
    searches: HashMap<String, Vec<RawSearchResult>>,
    documents: HashMap<String, RawSearchResult>,
    recent: Vec<RawSearchResult>,
    calls: Mutex<Vec<Call>>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: &str, results: Vec<RawSearchResult>) -> Self {
        self.searches.insert(query.to_string(), results);
        self
    }

    pub fn with_document(mut self, document: RawSearchResult) -> Self {
        self.documents.insert(document.id.clone(), document);
        self
    }

    pub fn with_recent(mut self, recent: Vec<RawSearchResult>) -> Self {
        self.recent = recent;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("call log lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("call log lock").push(call);
    }
}

impl WikiSource for FakeWiki {
    fn search(&self, query: &str, limit: usize) -> Vec<RawSearchResult> {
        self.record(Call::Search(query.to_string(), limit));
        self.searches
            .get(query)
            .map(|results| results.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    fn get_document(&self, id: &str) -> Option<RawSearchResult> {
        self.record(Call::GetDocument(id.to_string()));
        self.documents.get(id).cloned()
    }

    fn list_recent(&self, limit: usize) -> Vec<RawSearchResult> {
        self.record(Call::ListRecent(limit));
        self.recent.iter().take(limit).cloned().collect()
    }
}

/// A page with a storage body
pub fn page(id: &str, title: &str, markup: &str) -> RawSearchResult {
    RawSearchResult {
        body: Some(ContentBody {
            storage: Some(StorageValue {
                value: markup.to_string(),
            }),
        }),
        ..summary(id, title)
    }
}

/// A page as search returns it without an expanded body
pub fn summary(id: &str, title: &str) -> RawSearchResult {
    RawSearchResult {
        id: id.to_string(),
        title: Some(title.to_string()),
        content_type: Some("page".to_string()),
        space: Some(SpaceRef {
            key: Some("ENG".to_string()),
            name: Some("Engineering".to_string()),
        }),
        body: None,
        version: Some(VersionInfo {
            when: Some("2024-05-01T10:00:00.000Z".to_string()),
            number: Some(1),
        }),
        links: Some(Links {
            webui: Some(format!("/spaces/ENG/pages/{}", id)),
            base: Some("https://wiki.example.com/wiki".to_string()),
        }),
    }
}
