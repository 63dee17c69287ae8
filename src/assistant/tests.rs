use std::sync::Arc;

use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, body_string_contains, method, path},
};

use super::*;
use crate::config::ModelConfig;
use crate::confluence::RawSearchResult;
use crate::testing::{Call, FakeWiki, page, summary};

fn model_config(server: &MockServer) -> Config {
    Config {
        model: ModelConfig {
            api_key: "sk-test".to_string(),
            base_url: server.uri(),
            ..ModelConfig::default()
        },
        ..Config::default()
    }
}

fn completion(text: &str) -> serde_json::Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
}

fn auth_wiki() -> FakeWiki {
    FakeWiki::new().with_search(
        "How do I set up authentication?",
        vec![
            page("1", "Setup guide", "<p>Install the agent.</p>"),
            page("2", "SSO", "<p>Use the identity provider.</p>"),
        ],
    )
}

#[test]
fn confidence_follows_retrieved_count() {
    assert_eq!(Confidence::for_retrieved(0), Confidence::Low);
    assert_eq!(Confidence::for_retrieved(1), Confidence::High);
    assert_eq!(Confidence::for_retrieved(12), Confidence::High);
}

#[test]
fn confidence_labels() {
    assert_eq!(Confidence::High.to_string(), "High");
    assert_eq!(Confidence::Medium.to_string(), "Medium");
    assert_eq!(
        serde_json::to_value(Confidence::Low).expect("serializable"),
        json!("low")
    );
}

#[test]
fn offline_answer_cites_every_retrieved_page() {
    let wiki = Arc::new(auth_wiki());
    let assistant = OfflineAssistant::new(wiki, 5);

    let result = assistant.answer("How do I set up authentication?", 2000);

    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.sources[0].title, "Setup guide");
    assert_eq!(
        result.sources[0].url,
        "https://wiki.example.com/wiki/spaces/ENG/pages/1"
    );
    assert_eq!(result.sources[1].space, "Engineering");
    assert!(result.answer.starts_with(
        "Based on your Confluence documentation, I found 2 relevant pages:\n\n1. **Setup guide** (in Engineering)"
    ));
}

#[test]
fn nothing_found_anywhere() {
    let wiki = Arc::new(FakeWiki::new());
    let assistant = OfflineAssistant::new(Arc::clone(&wiki), 5);

    let result = assistant.answer("What is the VPN password?", 2000);

    assert_eq!(result.confidence, Confidence::Low);
    assert!(result.sources.is_empty());
    assert!(result.answer.starts_with(
        "I couldn't find any relevant information about 'What is the VPN password?'"
    ));
    assert!(
        result
            .answer
            .contains("1. The information might not be documented yet")
    );
    assert_eq!(wiki.calls().last(), Some(&Call::ListRecent(5)));
}

#[test]
fn recent_pages_offered_when_nothing_matches() {
    // Recent pages without any text survive the fallback lookup but not enrichment
    let recent = (1..=4)
        .map(|i| summary(&i.to_string(), &format!("Recent {}", i)))
        .collect();
    let wiki = Arc::new(FakeWiki::new().with_recent(recent));
    let assistant = OfflineAssistant::new(wiki, 5);

    let result = assistant.answer("quarterly budget", 2000);

    assert_eq!(result.confidence, Confidence::Low);
    assert!(result.answer.starts_with(
        "I couldn't find specific information about 'quarterly budget' in your Confluence documentation. However,"
    ));
    let titles: Vec<&str> = result.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Recent 1", "Recent 2", "Recent 3"]);
}

#[test]
fn offline_digest_shows_five_entries() {
    let long_text = "x".repeat(400);
    let documents: Vec<_> = (1..=7)
        .map(|i| page(&i.to_string(), &format!("Doc {}", i), &format!("<p>{}</p>", long_text)))
        .collect();
    let wiki = Arc::new(FakeWiki::new().with_search("digest please", documents));
    let assistant = OfflineAssistant::new(wiki, 7);

    let result = assistant.answer("digest please", 2000);

    assert_eq!(result.sources.len(), 7);
    let entries = result
        .answer
        .lines()
        .filter(|line| line.contains(". **Doc "))
        .count();
    assert_eq!(entries, 5);
    assert!(!result.answer.contains("**Doc 6**"));
    assert!(
        result
            .answer
            .ends_with("You can click on the links below to view the full content.")
    );
    for line in result.answer.lines().filter(|l| l.starts_with("   Preview: ")) {
        let preview = line.trim_start_matches("   Preview: ");
        assert_eq!(preview.chars().count(), 303);
        assert!(preview.ends_with("..."));
    }
}

#[test]
fn short_previews_are_not_marked_truncated() {
    let documents = vec![crate::retrieval::EnrichedDocument {
        id: "1".to_string(),
        title: "Short".to_string(),
        url: String::new(),
        space: "Ops".to_string(),
        content: "Brief content".to_string(),
        last_modified: "2024-01-01".to_string(),
        content_type: "page".to_string(),
    }];

    let digest = offline::render_digest(&documents);

    assert!(digest.contains("   Preview: Brief content\n"));
    assert!(digest.contains("   Last modified: 2024-01-01"));
}

#[test]
fn offline_recent_summary() {
    let recent = (1..=7)
        .map(|i| summary(&i.to_string(), &format!("Page {}", i)))
        .collect();
    let assistant = OfflineAssistant::new(Arc::new(FakeWiki::new().with_recent(recent)), 5);

    let result = assistant.summarize_recent(DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW);

    assert_eq!(result.pages.len(), 7);
    let lines: Vec<&str> = result.summary.lines().collect();
    assert_eq!(lines[0], "Found 7 recent pages in your Confluence space:");
    assert_eq!(lines[1], "");
    assert_eq!(
        lines[2],
        "• Page 1 (in Engineering) - 2024-05-01T10:00:00.000Z"
    );
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[7], "... and 2 more pages");
}

#[test]
fn recent_summary_preview_limits_pages() {
    let recent = (1..=12)
        .map(|i| summary(&i.to_string(), &format!("Page {}", i)))
        .collect();
    let wiki = Arc::new(FakeWiki::new().with_recent(recent));
    let assistant = OfflineAssistant::new(Arc::clone(&wiki), 5);

    let result = assistant.summarize_recent(20, 10);

    assert_eq!(result.pages.len(), 10);
    assert!(result.summary.starts_with("Found 10 recent pages"));
    assert_eq!(wiki.calls(), vec![Call::ListRecent(20)]);
}

#[test]
fn empty_recent_summary() {
    let assistant = OfflineAssistant::new(Arc::new(FakeWiki::new()), 5);

    let result = assistant.summarize_recent(20, 10);

    assert_eq!(result.summary, "No recent updates found.");
    assert!(result.pages.is_empty());
}

#[test]
fn recent_page_defaults() {
    let bare = RawSearchResult {
        id: "9".to_string(),
        ..RawSearchResult::default()
    };

    let recent = RecentPage::from(&bare);

    assert_eq!(recent.title, "Untitled");
    assert_eq!(recent.space, "Unknown Space");
    assert_eq!(recent.last_modified, "Unknown");
    assert_eq!(recent.url, "");
}

#[tokio::test]
async fn model_answer_uses_context_and_cites_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Title: Setup guide"))
        .and(body_string_contains("Question: How do I set up authentication?"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Follow the Setup guide, then configure SSO.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let assistant = ModelAssistant::new(Arc::new(auth_wiki()), &model_config(&server))
        .expect("assistant should build");

    let result = assistant.answer("How do I set up authentication?", 2000);

    assert_eq!(result.answer, "Follow the Setup guide, then configure SSO.");
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.confidence, Confidence::High);
}

#[tokio::test]
async fn model_failure_becomes_low_confidence_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let assistant = ModelAssistant::new(Arc::new(auth_wiki()), &model_config(&server))
        .expect("assistant should build");

    let result = assistant.answer("How do I set up authentication?", 2000);

    assert_eq!(result.confidence, Confidence::Low);
    assert!(result.sources.is_empty());
    assert!(
        result
            .answer
            .starts_with("I encountered an error while processing your question:")
    );
    assert!(result.answer.contains("500"));
}

#[tokio::test]
async fn model_is_not_called_when_nothing_is_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let assistant = ModelAssistant::new(Arc::new(FakeWiki::new()), &model_config(&server))
        .expect("assistant should build");

    let result = assistant.answer("anything", 2000);

    assert_eq!(result.confidence, Confidence::Low);
    assert!(result.sources.is_empty());
}

#[tokio::test]
async fn model_recent_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": 200 })))
        .and(body_string_contains(
            "- Page 1 (in Engineering) - 2024-05-01T10:00:00.000Z",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Mostly onboarding work.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let recent = (1..=3)
        .map(|i| summary(&i.to_string(), &format!("Page {}", i)))
        .collect();
    let wiki = Arc::new(FakeWiki::new().with_recent(recent));
    let assistant =
        ModelAssistant::new(wiki, &model_config(&server)).expect("assistant should build");

    let result = assistant.summarize_recent(20, 10);

    assert_eq!(result.summary, "Mostly onboarding work.");
    assert_eq!(result.pages.len(), 3);
}

#[tokio::test]
async fn model_recent_summary_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let wiki = Arc::new(FakeWiki::new().with_recent(vec![summary("1", "Page 1")]));
    let assistant =
        ModelAssistant::new(wiki, &model_config(&server)).expect("assistant should build");

    let result = assistant.summarize_recent(20, 10);

    assert!(
        result
            .summary
            .starts_with("Error retrieving recent updates:")
    );
    assert!(result.pages.is_empty());
}

#[test]
fn build_assistant_offline_needs_no_key() {
    let assistant = build_assistant(Arc::new(auth_wiki()), &Config::default(), AnswerMode::Offline)
        .expect("offline assistant should build");

    let result = assistant.answer("How do I set up authentication?", 100);
    assert_eq!(result.sources.len(), 2);
}
