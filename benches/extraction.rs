use criterion::{Criterion, criterion_group, criterion_main};
use std::fs;
use std::hint::black_box;
use std::path::Path;
use wiki_assistant::confluence::extract_text;
use wiki_assistant::context::{TokenCounter, assemble_context};
use wiki_assistant::retrieval::EnrichedDocument;

pub fn criterion_benchmark(c: &mut Criterion) {
    let test_page_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("benches/storage_page.html");
    let test_page = fs::read_to_string(test_page_path).expect("can read test file");
    c.bench_function("extract_text", |b| {
        b.iter(|| extract_text(black_box(&test_page)))
    });

    let content = extract_text(&test_page);
    let documents: Vec<EnrichedDocument> = (0..5)
        .map(|i| EnrichedDocument {
            id: i.to_string(),
            title: format!("Service onboarding {}", i),
            url: format!("https://wiki.example.com/wiki/spaces/ENG/pages/{}", i),
            space: "Engineering".to_string(),
            content: content.clone(),
            last_modified: "2024-05-01T10:00:00.000Z".to_string(),
            content_type: "page".to_string(),
        })
        .collect();
    let counter = TokenCounter::for_model("gpt-4o-mini").expect("tokenizer loads");
    c.bench_function("assemble_context", |b| {
        b.iter(|| assemble_context(black_box(&documents), black_box(2000), &counter))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
