use regex::{Regex, RegexBuilder};
use std::fmt::Write;
use std::sync::LazyLock;

use crate::config::LinkHint;

/// Chat-template control tokens such as `<|im_start|>` or `<|endoftext|>`.
static CONTROL_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[^|<>\s]{1,32}\|>").expect("valid regex"));

/// Strip chat-template control tokens so retrieved text cannot smuggle in
/// role switches.
pub fn sanitize_for_prompt(text: &str) -> String {
    CONTROL_TOKEN_RE.replace_all(text, "").into_owned()
}

pub fn build_system_prompt() -> String {
    String::from(
        "You are a helpful onboarding assistant answering only from the provided context.",
    )
}

/// Build the user prompt: numbered context blocks, link notes for hint terms
/// that appear in the context, then the question.
pub fn build_rag_prompt(question: &str, context_chunks: &[String], hints: &[LinkHint]) -> String {
    let mut ctx = String::new();
    for (i, chunk) in context_chunks.iter().enumerate() {
        if i > 0 {
            ctx.push_str("\n\n");
        }
        let _ = write!(ctx, "Context {}:\n{}", i + 1, sanitize_for_prompt(chunk));
    }

    let ctx_lower = ctx.to_lowercase();
    let mut notes = String::new();
    for hint in hints {
        if ctx_lower.contains(&hint.term.to_lowercase()) {
            let _ = writeln!(
                notes,
                "Note: When '{}' is mentioned, it refers to: {}",
                hint.term, hint.url
            );
        }
    }

    let question = sanitize_for_prompt(question);
    let mut prompt = String::from(
        "Use ONLY the context below to answer the question. \
         If the answer cannot be found in the context, say you don't know.\n\n\
         When giving step-by-step instructions, include every URL or link that \
         appears in the context, and give the full link for any service mentioned \
         in the notes.\n\n",
    );
    prompt.push_str(&ctx);
    prompt.push_str("\n\n");
    if !notes.is_empty() {
        prompt.push_str(&notes);
        prompt.push('\n');
    }
    let _ = write!(
        prompt,
        "User question: {question}\n\n\
         Answer with clear step-by-step instructions, \
         including all URLs/links mentioned in the context:"
    );
    prompt
}

/// Append ` (url)` after the first mention of each hint term whose URL the
/// answer does not already contain.
pub fn post_process_answer(answer: &str, hints: &[LinkHint]) -> String {
    let mut answer = answer.to_string();
    for hint in hints {
        if hint.term.is_empty() || answer.contains(&hint.url) {
            continue;
        }
        let Ok(re) = RegexBuilder::new(&regex::escape(&hint.term))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        if let Some(m) = re.find(&answer) {
            let pos = m.end();
            answer.insert_str(pos, &format!(" ({})", hint.url));
        }
    }
    answer
}
