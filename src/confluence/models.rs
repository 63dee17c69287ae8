use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A content item as returned by the Confluence REST API.
///
/// Every field is optional on the wire; accessors supply the defaults used
/// when rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub space: Option<SpaceRef>,
    #[serde(default)]
    pub body: Option<ContentBody>,
    #[serde(default)]
    pub version: Option<VersionInfo>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceRef {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBody {
    #[serde(default)]
    pub storage: Option<StorageValue>,
}

/// Storage-format markup of a page body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageValue {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub webui: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
}

/// Envelope of the search and listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ContentPage {
    #[serde(default)]
    pub results: Vec<RawSearchResult>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

/// Identity returned by the current-user endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RawSearchResult {
    #[inline]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    #[inline]
    pub fn space_name(&self) -> &str {
        self.space
            .as_ref()
            .and_then(|space| space.name.as_deref())
            .unwrap_or_default()
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("page")
    }

    /// Raw `version.when` timestamp, empty when absent
    #[inline]
    pub fn last_modified(&self) -> &str {
        self.version
            .as_ref()
            .and_then(|version| version.when.as_deref())
            .unwrap_or_default()
    }

    #[inline]
    pub fn modified_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.last_modified()).ok()
    }

    /// Whether the storage body was expanded in this response, even if empty
    #[inline]
    pub fn has_body(&self) -> bool {
        self.body
            .as_ref()
            .is_some_and(|body| body.storage.is_some())
    }

    #[inline]
    pub fn storage_markup(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|body| body.storage.as_ref())
            .map_or("", |storage| storage.value.as_str())
    }

    /// Absolute link to the page in the wiki UI, empty when the API gave none.
    #[inline]
    pub fn web_url(&self) -> String {
        let Some(links) = self.links.as_ref() else {
            return String::new();
        };
        let Some(webui) = links.webui.as_deref().filter(|webui| !webui.is_empty()) else {
            return String::new();
        };

        if webui.starts_with("http://") || webui.starts_with("https://") {
            return webui.to_string();
        }

        match links.base.as_deref() {
            Some(base) if !base.is_empty() => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    webui.trim_start_matches('/')
                )
            }
            _ => webui.to_string(),
        }
    }
}
