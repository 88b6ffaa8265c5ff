//! Prompt templates for answering and relevance judging.

use crate::document::Chunk;

/// Template for grounded answers. Placeholders: `{context}`, `{question}`.
pub const ANSWER_TEMPLATE: &str = "\
You are a reading assistant for a private collection of long-form texts. \
Answer the user's question using the passages retrieved from the texts below.

Rules:
1. Answer only from the supplied passages. Do not invent content.
2. If the passages do not contain the information needed, say explicitly that the context is insufficient.
3. Quote the passages where it helps.

--- Retrieved passages ---
{context}
--- End of passages ---

Question: {question}

Answer:";

/// Template for the relevance judge. Placeholders: `{question}`, `{documents}`.
pub const RERANK_TEMPLATE: &str = "\
You are an expert at judging how relevant text passages are to a question.

Question: {question}

Score every passage below from 0 to 10; higher means more relevant to the question.
The response must be a JSON array of objects with integer fields \"index\" (the 1-based passage number) \
and \"score\" (0-10), for example: [{\"index\": 1, \"score\": 8}, {\"index\": 2, \"score\": 3}]

Passages:
{documents}

Return only the JSON array, with no surrounding prose:";

/// Render the answer prompt.
pub fn answer_prompt(context: &str, question: &str) -> String {
    render(ANSWER_TEMPLATE, &[("context", context), ("question", question)])
}

/// Render the judge prompt.
pub fn rerank_prompt(question: &str, documents: &str) -> String {
    render(RERANK_TEMPLATE, &[("question", question), ("documents", documents)])
}

/// Substitute `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, and braces that do not form a
/// known placeholder are kept verbatim.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let var = vars.iter().find(|(name, _)| {
            tail.strip_prefix(name).is_some_and(|after| after.starts_with('}'))
        });
        match var {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Format chunks as numbered context blocks labelled with their source.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!("[Passage {}] (source: {})\n{}", i + 1, chunk.source(), chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format chunks as numbered, truncated previews for the judge.
///
/// Each preview holds the first `preview_length` characters with line
/// breaks flattened to spaces.
pub fn format_rerank_previews(chunks: &[Chunk], preview_length: usize) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Passage {}]: {}", i + 1, preview(&chunk.text, preview_length)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn preview(text: &str, length: usize) -> String {
    text.chars().take(length).map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect()
}
