use super::*;
use crate::testing::{Call, FakeWiki, page, summary};

#[test]
fn extract_keywords() {
    assert_eq!(
        super::extract_keywords("How do I set up Authentication for the API gateway?"),
        vec!["authentication", "gateway"]
    );
    assert_eq!(
        super::extract_keywords("deploy DEPLOY deploy rollback staging canary"),
        vec!["deploy", "rollback", "staging"]
    );
    assert!(super::extract_keywords("who am I?").is_empty());
}

#[test]
fn full_text_then_keyword_searches() {
    let wiki = FakeWiki::new().with_search(
        "Where is the deploy runbook?",
        vec![page("1", "Runbook", "<p>Steps</p>")],
    );

    let documents = retrieve(&wiki, "Where is the deploy runbook?", 6);

    assert_eq!(documents.len(), 1);
    assert_eq!(
        wiki.calls(),
        vec![
            Call::Search("Where is the deploy runbook?".to_string(), 6),
            Call::Search("where".to_string(), 3),
            Call::Search("deploy".to_string(), 3),
            Call::Search("runbook".to_string(), 3),
        ]
    );
}

#[test]
fn keyword_searches_ask_for_at_least_one_hit() {
    let wiki = FakeWiki::new();

    retrieve(&wiki, "rollback", 1);

    assert_eq!(
        wiki.calls(),
        vec![
            Call::Search("rollback".to_string(), 1),
            Call::Search("rollback".to_string(), 1),
            Call::ListRecent(1),
        ]
    );
}

#[test]
fn code_only_page_is_retrieved() {
    let wiki = FakeWiki::new().with_search(
        "bootstrap",
        vec![page(
            "7",
            "Bootstrap",
            r#"<ac:structured-macro ac:name="code"><ac:plain-text-body><![CDATA[make bootstrap SERVICE=payments]]></ac:plain-text-body></ac:structured-macro>"#,
        )],
    );

    let documents = retrieve(&wiki, "bootstrap", 5);

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].content, "make bootstrap SERVICE=payments");
}

#[test]
fn duplicates_keep_first_position() {
    let wiki = FakeWiki::new()
        .with_search(
            "token rotation",
            vec![
                page("a", "Rotation policy", "<p>Rotate monthly</p>"),
                page("b", "Tokens", "<p>Token types</p>"),
            ],
        )
        .with_search(
            "token",
            vec![
                page("b", "Tokens", "<p>Token types</p>"),
                page("c", "Vault", "<p>Secrets live here</p>"),
            ],
        )
        .with_search(
            "rotation",
            vec![page("a", "Rotation policy", "<p>Rotate monthly</p>")],
        );

    let documents = retrieve(&wiki, "token rotation", 10);

    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn falls_back_to_recent_pages_exactly_once() {
    let wiki = FakeWiki::new().with_recent(vec![page("r1", "Release notes", "<p>v2 shipped</p>")]);

    let documents = retrieve(&wiki, "anything about billing?", 4);

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "Release notes");

    let recent_calls = wiki
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::ListRecent(_)))
        .count();
    assert_eq!(recent_calls, 1);
    assert_eq!(wiki.calls().last(), Some(&Call::ListRecent(4)));
}

#[test]
fn no_recent_fallback_when_keywords_hit() {
    let wiki = FakeWiki::new().with_search(
        "billing",
        vec![page("k", "Billing FAQ", "<p>Invoices</p>")],
    );

    let documents = retrieve(&wiki, "billing questions", 4);

    assert_eq!(documents.len(), 1);
    assert!(
        !wiki
            .calls()
            .iter()
            .any(|call| matches!(call, Call::ListRecent(_)))
    );
}

#[test]
fn results_are_truncated_before_enrichment() {
    let hits = (1..=5)
        .map(|i| summary(&i.to_string(), &format!("Page {}", i)))
        .collect();
    let mut wiki = FakeWiki::new().with_search("q", hits);
    for i in 1..=5 {
        wiki = wiki.with_document(page(&i.to_string(), &format!("Page {}", i), "<p>body</p>"));
    }

    let documents = retrieve(&wiki, "q", 2);

    assert_eq!(documents.len(), 2);
    let fetched = wiki
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::GetDocument(_)))
        .count();
    assert_eq!(fetched, 2);
}

#[test]
fn missing_bodies_are_fetched() {
    let wiki = FakeWiki::new()
        .with_search("onboarding", vec![summary("7", "Onboarding")])
        .with_document(page(
            "7",
            "Onboarding",
            "<h2>Day one</h2><p>Get a laptop.</p>",
        ));

    let documents = retrieve(&wiki, "onboarding", 5);

    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.content, "Day one Get a laptop.");
    assert_eq!(document.space, "Engineering");
    assert_eq!(document.url, "https://wiki.example.com/wiki/spaces/ENG/pages/7");
    assert_eq!(document.content_type, "page");
    assert!(wiki.calls().contains(&Call::GetDocument("7".to_string())));
}

#[test]
fn documents_without_text_are_dropped() {
    let wiki = FakeWiki::new().with_search(
        "q",
        vec![
            summary("gone", "Deleted page"),
            page("empty", "Only a script", "<script>track()</script>"),
            page("ok", "Real page", "<p>Content</p>"),
        ],
    );

    let documents = retrieve(&wiki, "q", 5);

    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
}

#[test]
fn results_without_id_are_ignored() {
    let anonymous = page("", "No id", "<p>text</p>");
    let wiki = FakeWiki::new().with_search("q", vec![anonymous, page("1", "One", "<p>text</p>")]);

    let documents = retrieve(&wiki, "q", 5);

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, "1");
}
