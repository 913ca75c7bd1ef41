mod helpers;

use std::sync::Arc;

use helpers::{failed, ready, test_desk, unavailable, ScriptedModel, VocabEmbedder};
use quarry::llm::Completion;
use quarry::memory::log::StoreState;
use quarry::memory::types::DEFAULT_IMPACT_SCORE;

#[tokio::test]
async fn answered_question_is_logged_with_summary_and_score() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    let llm = ScriptedModel::answering(&[
        "Use in-memory fakes for the store.",
        "Fakes beat mocks.",
        "I'd rate this 8/10.",
    ]);

    let outcome = desk.ask(&llm, "  Should I mock the store?  ").await.unwrap();
    assert_eq!(outcome.answer, "Use in-memory fakes for the store.");
    assert!(outcome.context.is_empty());
    assert_eq!(outcome.entry.question, "Should I mock the store?");
    assert_eq!(outcome.entry.summary, "Fakes beat mocks.");
    assert_eq!(outcome.entry.impact_score, 8);
    assert!(!outcome.entry.topic.is_empty());

    let snapshot = desk.snapshot();
    assert_eq!(snapshot.entries, vec![outcome.entry]);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], ("Should I mock the store?".to_string(), None));
    assert!(prompts[1].0.starts_with("Summarize this answer in 1 sentence:\n"));
    assert!(prompts[2].0.starts_with("Rate the importance of this answer on a scale from 1 to 10:\n"));
}

#[tokio::test]
async fn retrieved_chunks_are_passed_as_context() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(
        tmp.path(),
        ready(Arc::new(VocabEmbedder::new(&["tokio", "garden"]))),
    );
    desk.chunk_store()
        .save(
            "notes.txt",
            &["Tokio schedules tasks.".into(), "Garden beds need mulch.".into()],
        )
        .unwrap();
    let llm = ScriptedModel::answering(&["It uses work stealing.", "Work stealing.", "6"]);

    let outcome = desk.ask(&llm, "How does tokio schedule?").await.unwrap();
    assert_eq!(outcome.context[0].chunk.text, "Tokio schedules tasks.");

    let context = llm.prompts()[0].1.clone().unwrap();
    assert!(context.starts_with("Tokio schedules tasks."));
    assert_eq!(outcome.entry.impact_score, 6);
}

#[tokio::test]
async fn failed_answer_appends_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    let llm = ScriptedModel::new(vec![failed("connection refused")]);

    let err = desk.ask(&llm, "What is a monad?").await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));

    let snapshot = desk.snapshot();
    assert!(snapshot.entries.is_empty());
    assert_eq!(snapshot.state, StoreState::Missing);
    assert_eq!(llm.prompts().len(), 1);
}

#[tokio::test]
async fn empty_question_is_rejected_before_any_call() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    let llm = ScriptedModel::answering(&["unused"]);

    assert!(desk.ask(&llm, "   ").await.is_err());
    assert!(llm.prompts().is_empty());
    assert!(desk.snapshot().entries.is_empty());
}

#[tokio::test]
async fn failed_summary_and_rating_fall_back() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    let llm = ScriptedModel::new(vec![
        Completion::Answer("Ownership moves on assignment.".into()),
        failed("timeout"),
        failed("timeout"),
    ]);

    let outcome = desk.ask(&llm, "What happens on assignment?").await.unwrap();
    assert_eq!(outcome.entry.summary, "");
    assert_eq!(outcome.entry.impact_score, DEFAULT_IMPACT_SCORE);
    assert_eq!(desk.snapshot().entries.len(), 1);
}

#[tokio::test]
async fn unparseable_rating_uses_default_score() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    let llm = ScriptedModel::answering(&["Answer.", "Summary.", "quite important"]);

    let outcome = desk.ask(&llm, "Why rate answers?").await.unwrap();
    assert_eq!(outcome.entry.impact_score, DEFAULT_IMPACT_SCORE);
}

#[tokio::test]
async fn unavailable_retrieval_aborts_before_answering() {
    let tmp = tempfile::tempdir().unwrap();
    let desk = test_desk(tmp.path(), unavailable());
    desk.chunk_store()
        .save("notes.txt", &["Some stored text.".into()])
        .unwrap();
    let llm = ScriptedModel::answering(&["unused"]);

    let err = desk.ask(&llm, "What is stored?").await.unwrap_err();
    assert!(format!("{err:#}").contains("embedding provider unavailable"));
    assert!(llm.prompts().is_empty());
    assert!(desk.snapshot().entries.is_empty());
}
