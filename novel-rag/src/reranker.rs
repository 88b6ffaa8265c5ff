//! Relevance reranking with a generative-model judge.
//!
//! [`LlmReranker`] shows the judge a numbered preview of every candidate,
//! asks for a JSON array of `{index, score}` objects, and keeps the
//! `top_k` best-scored candidates. Judge output is untrusted: it is parsed by
//! [`parse_judge_response`] into a [`JudgeVerdict`], and any failure (call
//! error or malformed verdict) takes the fallback branch that returns the
//! first `top_k` candidates in their original order.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::llm::GenerativeModel;
use crate::prompts::{format_rerank_previews, rerank_prompt};

/// Highest score the judge may assign.
pub const MAX_SCORE: u8 = 10;

/// A reranker that re-scores and trims a candidate set.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank `candidates` for `question`, returning at most the reranker's
    /// configured number of chunks, each drawn from `candidates`.
    async fn rerank(&self, question: &str, candidates: Vec<Chunk>) -> Result<Vec<Chunk>>;
}

/// The judge's score for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceScore {
    /// 1-based position of the candidate in the prompt.
    pub index: usize,
    /// Relevance in `0..=10`.
    pub score: u8,
}

/// The parsed judge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeVerdict {
    /// Scores in the order the judge listed them.
    Scores(Vec<RelevanceScore>),
    /// The response did not follow the expected format.
    Malformed(String),
}

/// One judge entry. A missing `index` reads as the first candidate and a
/// missing `score` as zero.
#[derive(Deserialize)]
struct RawScore {
    #[serde(default = "first_index")]
    index: f64,
    #[serde(default)]
    score: f64,
}

fn first_index() -> f64 {
    1.0
}

/// Parse a free-form judge response.
///
/// Grammar: the substring from the first `[` to the last `]` must be a JSON
/// array of objects with numeric `index` and `score` fields. A missing
/// `index` defaults to `1` and a missing `score` to `0`. Scores are rounded
/// and clamped to `0..=10`. An index that is not a positive integer is kept
/// as `0`, which never maps to a candidate.
pub fn parse_judge_response(text: &str) -> JudgeVerdict {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return JudgeVerdict::Malformed("no JSON array found".to_string());
    };
    if end < start {
        return JudgeVerdict::Malformed("no JSON array found".to_string());
    }

    match serde_json::from_str::<Vec<RawScore>>(&text[start..=end]) {
        Ok(raw) => JudgeVerdict::Scores(
            raw.into_iter()
                .map(|item| RelevanceScore {
                    index: if item.index >= 1.0 && item.index.fract() == 0.0 {
                        item.index as usize
                    } else {
                        0
                    },
                    score: item.score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8,
                })
                .collect(),
        ),
        Err(e) => JudgeVerdict::Malformed(format!("invalid JSON: {e}")),
    }
}

/// Order `candidates` by `scores` and keep at most `top_k` of them.
///
/// Scores are stable-sorted in descending order, the first `top_k` entries
/// are taken, and entries whose index is out of range or repeated are
/// discarded. Returns `None` if no entry maps to a candidate.
pub fn select_by_scores(
    candidates: &[Chunk],
    mut scores: Vec<RelevanceScore>,
    top_k: usize,
) -> Option<Vec<Chunk>> {
    scores.sort_by(|a, b| b.score.cmp(&a.score));

    let mut seen = HashSet::new();
    let selected: Vec<Chunk> = scores
        .iter()
        .take(top_k)
        .filter(|s| s.index >= 1 && s.index <= candidates.len() && seen.insert(s.index))
        .map(|s| {
            debug!(index = s.index, score = s.score, "selected candidate");
            candidates[s.index - 1].clone()
        })
        .collect();

    if selected.is_empty() { None } else { Some(selected) }
}

/// A [`Reranker`] that asks a [`GenerativeModel`] to score candidates.
///
/// # Example
///
/// ```rust,ignore
/// use novel_rag::{LlmReranker, Reranker};
///
/// let reranker = LlmReranker::new(llm, 5, 300);
/// let best = reranker.rerank("Who betrays the captain?", candidates).await?;
/// assert!(best.len() <= 5);
/// ```
pub struct LlmReranker {
    judge: Arc<dyn GenerativeModel>,
    top_k: usize,
    preview_length: usize,
}

impl LlmReranker {
    /// Create a reranker keeping `top_k` candidates and showing the judge
    /// `preview_length` characters of each.
    pub fn new(judge: Arc<dyn GenerativeModel>, top_k: usize, preview_length: usize) -> Self {
        info!(top_k, preview_length, "reranker initialized");
        Self { judge, top_k, preview_length }
    }

    async fn judge(&self, question: &str, candidates: &[Chunk]) -> Result<String> {
        let documents = format_rerank_previews(candidates, self.preview_length);
        let prompt = rerank_prompt(question, &documents);
        debug!(prompt_len = prompt.len(), "requesting relevance scores");
        self.judge
            .generate(&prompt)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| RagError::reranker("relevance judge call failed", e.to_string()))
    }

    fn fallback(&self, mut candidates: Vec<Chunk>, err: &RagError) -> Vec<Chunk> {
        error!(error = %err, "reranking failed, keeping original order");
        candidates.truncate(self.top_k);
        candidates
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, question: &str, candidates: Vec<Chunk>) -> Result<Vec<Chunk>> {
        if candidates.is_empty() {
            warn!("rerank called with no candidates");
            return Ok(candidates);
        }
        if candidates.len() <= self.top_k {
            debug!(count = candidates.len(), top_k = self.top_k, "too few candidates to rerank");
            return Ok(candidates);
        }

        info!(question_len = question.chars().count(), count = candidates.len(), "reranking");

        let response = match self.judge(question, &candidates).await {
            Ok(response) => response,
            Err(e) => return Ok(self.fallback(candidates, &e)),
        };

        let scores = match parse_judge_response(&response) {
            JudgeVerdict::Scores(scores) => scores,
            JudgeVerdict::Malformed(reason) => {
                let err = RagError::reranker("could not parse relevance scores", reason);
                return Ok(self.fallback(candidates, &err));
            }
        };
        debug!(parsed = scores.len(), "parsed relevance scores");

        match select_by_scores(&candidates, scores, self.top_k) {
            Some(reranked) => {
                info!(returned = reranked.len(), "rerank complete");
                Ok(reranked)
            }
            None => {
                let err =
                    RagError::reranker("no usable relevance scores", "every index out of range");
                Ok(self.fallback(candidates, &err))
            }
        }
    }
}
