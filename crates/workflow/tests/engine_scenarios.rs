//! End-to-end runs of the workflow engine against scripted collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{engine, fast_config, FixedStore, Script, ScriptedJudge, ScriptedSearch};
use crag_knowledge::{EvidenceItem, EvidenceSource};
use crag_workflow::{CancellationToken, FailureReason, Grade, Route, RunConfig, RunStatus};

const PASSAGES: [&str; 3] = [
    "Agent memory is split into short-term and long-term memory.",
    "Short-term memory is in-context learning.",
    "Long-term memory uses an external vector store.",
];

#[tokio::test]
async fn test_vectorstore_route_with_relevant_evidence() {
    let judge = Arc::new(ScriptedJudge::new(Route::VectorStore));
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("What kinds of agent memory exist?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(outcome.verified_answer(), Some("answer 1"));
    assert_eq!(outcome.evidence_used.len(), 3);
    assert!(outcome
        .evidence_used
        .iter()
        .all(|item| item.source() == EvidenceSource::Index));
    assert_eq!(search.calls(), 0);
    assert_eq!(store.calls(), 1);
    assert_eq!(outcome.stats.route, Some(Route::VectorStore));
    assert_eq!(outcome.stats.generations, 1);
    // route + 3 grades + generate + groundedness + usefulness
    assert_eq!(outcome.stats.judgment_calls, 7);
}

#[tokio::test]
async fn test_websearch_route_searches_directly() {
    let judge = Arc::new(ScriptedJudge::new(Route::WebSearch));
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![vec![
        "The Bears drafted Caleb Williams.",
        "He was the first overall pick.",
    ]]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("Who did the Bears draft first?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(
        outcome.evidence_used,
        vec![EvidenceItem::from_search(
            "The Bears drafted Caleb Williams.\nHe was the first overall pick."
        )]
    );
    assert_eq!(judge.generated().len(), 1);
    assert_eq!(store.calls(), 0);
    assert_eq!(judge.relevance_calls(), 0);
}

#[tokio::test]
async fn test_irrelevant_evidence_falls_back_to_search_then_regenerates() {
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore)
            .irrelevant(&PASSAGES)
            .groundedness(Script::new(&[Grade::No], Grade::Yes)),
    );
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![vec!["A web answer."]]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("What is the weather in Paris?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(outcome.verified_answer(), Some("answer 2"));
    assert_eq!(
        outcome.evidence_used,
        vec![EvidenceItem::from_search("A web answer.")]
    );

    let generated = judge.generated();
    assert_eq!(generated.len(), 2);
    assert_eq!(generated[0], generated[1]);
    assert_eq!(generated[0].len(), 1);
    assert_eq!(search.calls(), 1);
    assert_eq!(outcome.stats.groundedness_failures, 1);
}

#[tokio::test]
async fn test_ungrounded_answers_fail_after_verify_budget() {
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore).groundedness(Script::always(Grade::No)),
    );
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("What kinds of agent memory exist?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::VerifyRetriesExhausted));
    assert_eq!(outcome.answer.as_deref(), Some("answer 3"));
    assert_eq!(outcome.verified_answer(), None);
    assert_eq!(judge.generated().len(), 3);
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_grounded_regeneration_never_changes_evidence() {
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore)
            .groundedness(Script::new(&[Grade::No, Grade::No], Grade::Yes)),
    );
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    let generated = judge.generated();
    assert_eq!(generated.len(), 3);
    assert!(generated.iter().all(|evidence| evidence == &generated[0]));
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_unhelpful_answer_searches_and_grows_evidence() {
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore)
            .usefulness(Script::new(&[Grade::No], Grade::Yes)),
    );
    let store = Arc::new(FixedStore::new(&PASSAGES[..2]));
    let search = Arc::new(ScriptedSearch::new(vec![vec!["Fresh web context."]]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    let generated = judge.generated();
    assert_eq!(generated.len(), 2);
    assert_eq!(generated[0].len(), 2);
    assert_eq!(generated[1].len(), 3);
    assert_eq!(generated[1][..2], generated[0][..]);
    assert_eq!(
        generated[1][2],
        EvidenceItem::from_search("Fresh web context.")
    );
    assert_eq!(outcome.stats.usefulness_failures, 1);
    assert_eq!(search.calls(), 1);
}

#[tokio::test]
async fn test_unhelpful_answers_fail_after_search_budget() {
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore).usefulness(Script::always(Grade::No)),
    );
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::SearchRetriesExhausted));
    assert_eq!(search.calls(), 2);
    assert_eq!(judge.generated().len(), 3);
    assert_eq!(outcome.answer.as_deref(), Some("answer 3"));
}

#[tokio::test]
async fn test_repeated_search_result_fails_instead_of_regenerating() {
    let judge = Arc::new(
        ScriptedJudge::new(Route::WebSearch)
            .usefulness(Script::new(&[Grade::No], Grade::Yes)),
    );
    let store = Arc::new(FixedStore::new(&[]));
    let search = Arc::new(ScriptedSearch::new(vec![vec!["same"], vec!["same"]]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::NoNewEvidence));
    assert_eq!(outcome.answer.as_deref(), Some("answer 1"));
    assert_eq!(outcome.evidence_used, vec![EvidenceItem::from_search("same")]);
    assert_eq!(judge.generated().len(), 1);
    assert_eq!(search.calls(), 2);
}

#[tokio::test]
async fn test_grading_preserves_retrieval_order() {
    let passages = [
        "a",
        "bbbbbb",
        "ccccc",
        "dddd",
        "eee",
        "ff",
    ];
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore)
            .irrelevant(&["bbbbbb", "dddd"])
            .grade_delay(Duration::from_millis(20)),
    );
    let store = Arc::new(FixedStore::new(&passages));
    let search = Arc::new(ScriptedSearch::new(vec![vec!["web"]]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(
        outcome.evidence_used,
        vec![
            EvidenceItem::from_index("a"),
            EvidenceItem::from_index("ccccc"),
            EvidenceItem::from_index("eee"),
            EvidenceItem::from_index("ff"),
            EvidenceItem::from_search("web"),
        ]
    );
}

#[tokio::test]
async fn test_grading_respects_concurrency_bound() {
    let passages: Vec<String> = (0..8).map(|i| format!("passage {}", i)).collect();
    let refs: Vec<&str> = passages.iter().map(String::as_str).collect();
    let judge = Arc::new(
        ScriptedJudge::new(Route::VectorStore).grade_delay(Duration::from_millis(30)),
    );
    let store = Arc::new(FixedStore::new(&refs));
    let search = Arc::new(ScriptedSearch::new(vec![]));
    let config = RunConfig {
        grade_concurrency: 2,
        ..fast_config()
    };

    let outcome = engine(&judge, &store, &search, config)
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(judge.relevance_calls(), 8);
    assert!(judge.max_in_flight() <= 2);
    assert!(judge.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_empty_web_search_fails_without_answer() {
    let judge = Arc::new(ScriptedJudge::new(Route::WebSearch));
    let store = Arc::new(FixedStore::new(&[]));
    let search = Arc::new(ScriptedSearch::new(vec![vec![]]));

    let outcome = engine(&judge, &store, &search, fast_config())
        .run("q", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::NoEvidence));
    assert_eq!(outcome.answer, None);
    assert!(judge.generated().is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_do_not_share_state() {
    let judge = Arc::new(ScriptedJudge::new(Route::VectorStore));
    let store = Arc::new(FixedStore::new(&PASSAGES));
    let search = Arc::new(ScriptedSearch::new(vec![]));
    let engine = engine(&judge, &store, &search, fast_config());
    let token = CancellationToken::new();

    let (first, second) = tokio::join!(engine.run("first", &token), engine.run("second", &token));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.status, RunStatus::Ok);
    assert_eq!(second.status, RunStatus::Ok);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.evidence_used, second.evidence_used);
    assert_eq!(store.calls(), 2);
}
