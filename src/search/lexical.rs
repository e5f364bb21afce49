//! Token-overlap scoring between a question and chunk text.
//!
//! Used both as the primary retrieval gate over the whole corpus and as the
//! rerank step over vector-search candidates.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Tokens this short or shorter are ignored.
const MIN_TOKEN_CHARS: usize = 3;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// The scoring terms of a question: distinct lower-cased word tokens longer
/// than three characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms {
    terms: BTreeSet<String>,
}

impl QueryTerms {
    pub fn new(question: &str) -> Self {
        let lowered = question.to_lowercase();
        let terms = WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
            .map(str::to_string)
            .collect();
        Self { terms }
    }

    /// Number of terms contained (as substrings) in the lower-cased `chunk`.
    pub fn score(&self, chunk: &str) -> usize {
        if self.terms.is_empty() {
            return 0;
        }
        let text = chunk.to_lowercase();
        self.terms.iter().filter(|t| text.contains(t.as_str())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }
}

/// An item paired with its lexical score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: usize,
}

/// Lexical overlap score between `question` and `chunk`.
pub fn score(question: &str, chunk: &str) -> usize {
    QueryTerms::new(question).score(chunk)
}

/// Score every item and sort by score, highest first.
///
/// The sort is stable: items with equal scores keep their input order.
pub fn rerank_scored<T, I>(terms: &QueryTerms, items: I) -> Vec<Ranked<T>>
where
    T: AsRef<str>,
    I: IntoIterator<Item = T>,
{
    let mut ranked: Vec<Ranked<T>> = items
        .into_iter()
        .map(|item| {
            let score = terms.score(item.as_ref());
            Ranked { item, score }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Sort `chunks` by lexical overlap with `question`, highest first (stable).
pub fn rerank<T, I>(question: &str, chunks: I) -> Vec<T>
where
    T: AsRef<str>,
    I: IntoIterator<Item = T>,
{
    let terms = QueryTerms::new(question);
    rerank_scored(&terms, chunks)
        .into_iter()
        .map(|r| r.item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_access_question_scores() {
        let s = score(
            "What is the GitHub access process?",
            "To get GitHub access, visit the portal.",
        );
        // "github" and "access" appear; "what" and "process" do not
        assert_eq!(s, 2);
    }

    #[test]
    fn test_short_tokens_filtered() {
        assert_eq!(score("a an is", "a an is everywhere in this chunk"), 0);
        assert!(QueryTerms::new("a an is the").is_empty());
    }

    #[test]
    fn test_tokens_deduplicated_and_lowercased() {
        let terms = QueryTerms::new("Vault VAULT vault access?");
        let collected: Vec<&str> = terms.iter().collect();
        assert_eq!(collected, vec!["access", "vault"]);
        assert_eq!(terms.score("Request Vault Access here"), 2);
    }

    #[test]
    fn test_substring_containment() {
        // "access" matches inside "accessible"
        assert_eq!(score("access", "The portal is accessible."), 1);
    }

    #[test]
    fn test_punctuation_splits_tokens() {
        // "what's" yields "what" and "s"; only "what" survives the length filter
        let terms = QueryTerms::new("What's the weather");
        let collected: Vec<&str> = terms.iter().collect();
        assert_eq!(collected, vec!["weather", "what"]);
    }

    #[test]
    fn test_unicode_word_characters() {
        let terms = QueryTerms::new("Zugang für Größe");
        assert_eq!(terms.score("der zugang ist offen, größe egal"), 2);
    }

    #[test]
    fn test_rerank_orders_by_score() {
        let chunks = vec![
            "Vacation policy is 20 days.",
            "GitHub access requires SSO login.",
            "Access to the office.",
        ];
        let ranked = rerank("How do I get GitHub access", chunks);
        assert_eq!(ranked[0], "GitHub access requires SSO login.");
        assert_eq!(ranked[1], "Access to the office.");
        assert_eq!(ranked[2], "Vacation policy is 20 days.");
    }

    #[test]
    fn test_rerank_is_stable_for_ties() {
        let chunks = vec!["alpha one", "beta two", "gamma three", "delta four"];
        let ranked = rerank("nothing matches here", chunks.clone());
        assert_eq!(ranked, chunks);

        let chunks = vec!["first vault", "none", "second vault", "third vault"];
        let ranked = rerank("vault", chunks);
        assert_eq!(ranked, vec!["first vault", "second vault", "third vault", "none"]);
    }

    #[test]
    fn test_rerank_scored_reports_scores() {
        let terms = QueryTerms::new("github access");
        let ranked = rerank_scored(&terms, ["github access", "github", "other"]);
        let scores: Vec<usize> = ranked.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![2, 1, 0]);
    }
}
