//! Behaviour of the model-judged reranker, including its fallback branch.

mod common;

use std::sync::Arc;

use common::{ScriptedModel, numbered_chunks};
use novel_rag::{Chunk, LlmReranker, Reranker};
use proptest::prelude::*;

fn ids(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.id.as_str()).collect()
}

fn reranker(model: &Arc<ScriptedModel>, top_k: usize) -> LlmReranker {
    LlmReranker::new(Arc::clone(model) as _, top_k, 300)
}

#[tokio::test]
async fn judge_scores_decide_order_and_length() {
    let model = Arc::new(ScriptedModel::new(
        r#"[{"index":3,"score":9},{"index":1,"score":7},{"index":5,"score":6},
            {"index":2,"score":5},{"index":4,"score":4},{"index":6,"score":3},
            {"index":7,"score":2},{"index":8,"score":1},{"index":9,"score":1},
            {"index":10,"score":0}]"#,
    ));

    let reranked = reranker(&model, 5).rerank("who?", numbered_chunks(15)).await.unwrap();

    assert_eq!(ids(&reranked), vec!["c3", "c1", "c5", "c2", "c4"]);
    assert_eq!(model.judge_calls(), 1);
}

#[tokio::test]
async fn prose_reply_falls_back_to_original_prefix() {
    let model = Arc::new(ScriptedModel::new("Passage 3 looks the most relevant to me."));
    let candidates = numbered_chunks(15);

    let reranked = reranker(&model, 5).rerank("who?", candidates.clone()).await.unwrap();

    assert_eq!(reranked, candidates[..5].to_vec());
}

#[tokio::test]
async fn invalid_json_falls_back_to_original_prefix() {
    let model = Arc::new(ScriptedModel::new("[{index: 3, score: 9}]"));
    let candidates = numbered_chunks(8);

    let reranked = reranker(&model, 5).rerank("who?", candidates.clone()).await.unwrap();

    assert_eq!(reranked, candidates[..5].to_vec());
}

#[tokio::test]
async fn judge_failure_falls_back_to_original_prefix() {
    let model = Arc::new(ScriptedModel::failing_judge());
    let candidates = numbered_chunks(10);

    let reranked = reranker(&model, 4).rerank("who?", candidates.clone()).await.unwrap();

    assert_eq!(reranked, candidates[..4].to_vec());
    assert_eq!(model.judge_calls(), 1);
}

#[tokio::test]
async fn unmappable_scores_fall_back_to_original_prefix() {
    let model = Arc::new(ScriptedModel::new(r#"[{"index":40,"score":9},{"index":0,"score":8}]"#));
    let candidates = numbered_chunks(10);

    let reranked = reranker(&model, 3).rerank("who?", candidates.clone()).await.unwrap();

    assert_eq!(reranked, candidates[..3].to_vec());
}

#[tokio::test]
async fn out_of_range_entries_are_dropped_after_taking_top_k() {
    let model = Arc::new(ScriptedModel::new(
        r#"[{"index":2,"score":9},{"index":99,"score":8},{"index":4,"score":7},
            {"index":1,"score":2}]"#,
    ));

    let reranked = reranker(&model, 3).rerank("who?", numbered_chunks(6)).await.unwrap();

    assert_eq!(ids(&reranked), vec!["c2", "c4"]);
}

#[tokio::test]
async fn equal_scores_keep_judge_order_and_duplicates_are_dropped() {
    let model = Arc::new(ScriptedModel::new(
        r#"Scores: [{"index":4,"score":6},{"index":2,"score":6},{"index":4,"score":5}] done"#,
    ));

    let reranked = reranker(&model, 3).rerank("who?", numbered_chunks(6)).await.unwrap();

    assert_eq!(ids(&reranked), vec!["c4", "c2"]);
}

#[tokio::test]
async fn entries_missing_a_field_still_count() {
    let model = Arc::new(ScriptedModel::new(r#"[{"index":3},{"index":1,"score":7}]"#));

    let reranked = reranker(&model, 3).rerank("who?", numbered_chunks(10)).await.unwrap();

    assert_eq!(ids(&reranked), vec!["c1", "c3"]);
}

#[tokio::test]
async fn entry_without_index_points_at_first_candidate() {
    let model = Arc::new(ScriptedModel::new(r#"[{"score":9},{"index":5,"score":4}]"#));

    let reranked = reranker(&model, 2).rerank("who?", numbered_chunks(6)).await.unwrap();

    assert_eq!(ids(&reranked), vec!["c1", "c5"]);
}

#[tokio::test]
async fn few_candidates_pass_through_without_judging() {
    let model = Arc::new(ScriptedModel::new("[]"));
    let candidates = numbered_chunks(5);

    let reranked = reranker(&model, 5).rerank("who?", candidates.clone()).await.unwrap();

    assert_eq!(reranked, candidates);
    assert_eq!(model.judge_calls(), 0);

    let empty = reranker(&model, 5).rerank("who?", Vec::new()).await.unwrap();
    assert!(empty.is_empty());
    assert_eq!(model.judge_calls(), 0);
}

/// Generate judge replies: valid arrays with arbitrary indices and scores,
/// and arbitrary prose.
fn arb_judge_reply() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::collection::vec((0usize..30, -3i32..15), 0..20).prop_map(|entries| {
            let items: Vec<String> = entries
                .iter()
                .map(|(i, s)| format!(r#"{{"index":{i},"score":{s}}}"#))
                .collect();
            format!("Here you go: [{}]", items.join(","))
        }),
        "[ -~]{0,80}",
    ]
}

/// **Property: reranking is bounded and never fabricates**
/// *For any* judge reply, the reranked set holds at most `top_k` chunks,
/// each drawn from the candidates, with no repeats.
mod prop_rerank_bounded {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn output_is_a_bounded_subset_of_candidates(
            reply in arb_judge_reply(),
            count in 0usize..20,
            top_k in 1usize..8,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let candidates = numbered_chunks(count);
            let model = Arc::new(ScriptedModel::new(reply));

            let reranked = rt
                .block_on(reranker(&model, top_k).rerank("question", candidates.clone()))
                .unwrap();

            prop_assert!(reranked.len() <= top_k);
            prop_assert!(reranked.iter().all(|c| candidates.contains(c)));
            let mut seen: Vec<&str> = ids(&reranked);
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), reranked.len());
            if count <= top_k {
                prop_assert_eq!(reranked, candidates);
            }
        }
    }
}
