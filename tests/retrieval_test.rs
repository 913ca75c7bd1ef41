mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use helpers::{ready, test_desk, unavailable, BrokenEmbedder, VocabEmbedder};
use quarry::retrieval::RetrievalError;

const VOCAB: &[&str] = &["rust", "borrow", "async", "tokio", "garden", "tomato"];

fn seed(desk: &quarry::desk::ResearchDesk) {
    let store = desk.chunk_store();
    store
        .save(
            "rust.txt",
            &[
                "Rust borrow checker rules.".into(),
                "Async tasks run on tokio.".into(),
            ],
        )
        .unwrap();
    store
        .save("garden.txt", &["Tomato plants need sun in the garden.".into()])
        .unwrap();
}

#[test]
fn empty_store_returns_nothing_without_embedding() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(VocabEmbedder::new(VOCAB));
    let desk = test_desk(tmp.path(), ready(embedder.clone()));

    assert!(desk.retrieve("anything", 5).unwrap().is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

    // a broken or missing embedder is never consulted either
    let desk = test_desk(tmp.path(), ready(Arc::new(BrokenEmbedder)));
    assert!(desk.retrieve("anything", 5).unwrap().is_empty());
    let desk = test_desk(tmp.path(), unavailable());
    assert!(desk.retrieve("anything", 5).unwrap().is_empty());
}

#[test]
fn most_similar_chunk_ranks_first() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), ready(Arc::new(VocabEmbedder::new(VOCAB))));
    seed(&desk);

    let results = desk.retrieve("how does the tokio async runtime work", 3).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk.text, "Async tasks run on tokio.");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!(results
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
}

#[test]
fn result_count_is_bounded_by_top_k_and_corpus() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), ready(Arc::new(VocabEmbedder::new(VOCAB))));
    seed(&desk);

    assert_eq!(desk.retrieve("rust", 1).unwrap().len(), 1);
    assert_eq!(desk.retrieve("rust", 50).unwrap().len(), 3);
    assert!(desk.retrieve("rust", 0).unwrap().is_empty());
}

#[test]
fn ties_break_by_load_order() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), ready(Arc::new(VocabEmbedder::new(VOCAB))));
    seed(&desk);

    // garden.txt_chunks.json loads before rust.txt_chunks.json; both remaining chunks score 0
    let results = desk.retrieve("borrow checker in rust", 3).unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Rust borrow checker rules.",
            "Tomato plants need sun in the garden.",
            "Async tasks run on tokio.",
        ]
    );
}

#[test]
fn repeated_queries_are_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), ready(Arc::new(VocabEmbedder::new(VOCAB))));
    seed(&desk);

    let ids = |q: &str| -> Vec<String> {
        desk.retrieve(q, 3)
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.id)
            .collect()
    };
    assert_eq!(ids("tomato garden"), ids("tomato garden"));
}

#[test]
fn unavailable_embedder_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    seed(&desk);

    let err = desk.retrieve("rust", 3).unwrap_err();
    assert!(matches!(err, RetrievalError::UnavailableDependency(_)));
    assert!(err.to_string().contains("model files missing"));
}

#[test]
fn failing_embedder_is_reported_as_unavailable() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), ready(Arc::new(BrokenEmbedder)));
    seed(&desk);

    let err = desk.retrieve("rust", 3).unwrap_err();
    assert!(matches!(err, RetrievalError::UnavailableDependency(_)));
    assert!(err.to_string().contains("inference backend crashed"));
}

#[test]
fn rechunked_memory_is_retrievable() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), ready(Arc::new(VocabEmbedder::new(VOCAB))));
    desk.append_interaction(
        "When should I grow tomato seedlings?",
        "Start them indoors in early spring.",
        "Start indoors.",
        6,
    )
    .unwrap();

    desk.rechunk_memory().unwrap();
    let results = desk.retrieve("tomato", 1).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].chunk.text.starts_with("Q: When should I grow tomato seedlings?"));
    assert_eq!(results[0].chunk.impact_score, Some(6));
}
