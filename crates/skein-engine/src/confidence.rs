use regex::Regex;
use serde::{Deserialize, Serialize};

/// A thread referenced by a generated answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelatedThread {
    pub thread_id: String,
    pub title: String,
    pub url: String,
}

/// "Nothing found"-class phrasings. Each matched pattern costs 0.1,
/// capped at 0.3 total.
pub const DEFAULT_NEGATIVE_PATTERNS: &[&str] = &[
    r"(?i)not found",
    r"(?i)no (?:matching|relevant) (?:threads?|messages?|results?|information)",
    r"(?i)\bunknown\b",
    r"(?i)(?:don't|do not) know",
    r"(?i)(?:cannot|can't|could not) (?:confirm|verify|find)",
    r"(?i)does not exist",
];

const THREAD_ID_TOKEN: &str = r"thr_[a-z0-9]+|[TC][A-Z0-9]{4,}";

/// Grades generated answers on a bounded heuristic scale.
///
/// Scoring is a pure function of its inputs: identical inputs always
/// yield the identical score. The negative-pattern list is injectable
/// so it can be tuned without touching the arithmetic.
pub struct ConfidenceScorer {
    negative_patterns: Vec<Regex>,
    thread_id_token: Regex,
    reference_patterns: Vec<Regex>,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_NEGATIVE_PATTERNS).expect("default patterns compile")
    }
}

impl ConfidenceScorer {
    pub fn new(negative_patterns: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            negative_patterns: negative_patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            thread_id_token: Regex::new(THREAD_ID_TOKEN)?,
            reference_patterns: vec![
                Regex::new(r"`(thr_[a-z0-9]+)`")?,
                Regex::new(r"(?i)thread id[:\s]*`?(thr_[a-z0-9]+)`?")?,
                Regex::new(r"(?i)\bid[:\s]+`?([TC][A-Z0-9]{4,})`?")?,
            ],
        })
    }

    /// Score an answer in `[0.0, 1.0]`, rounded to 2 decimals.
    pub fn score(
        &self,
        answer: &str,
        related_threads: &[RelatedThread],
        question: &str,
    ) -> f64 {
        let mut confidence = 0.5_f64;

        // Corroborating threads, capped at three threads' worth.
        confidence += (0.1 * related_threads.len() as f64).min(0.3);

        // Longer answers carry more detail.
        let length = answer.chars().count();
        if length > 500 {
            confidence += 0.2;
        } else if length > 200 {
            confidence += 0.1;
        } else if length > 100 {
            confidence += 0.05;
        }

        // Concrete structure: identifiers, links, markdown.
        if self.thread_id_token.is_match(answer) {
            confidence += 0.05;
        }
        if answer.contains("https://") || answer.contains("http://") {
            confidence += 0.05;
        }
        if answer.contains("**") || answer.contains("##") {
            confidence += 0.05;
        }

        // "Nothing found"-class phrasing, each pattern counted once.
        let negative_hits = self
            .negative_patterns
            .iter()
            .filter(|p| p.is_match(answer))
            .count();
        confidence -= (negative_hits as f64 * 0.1).min(0.3);

        // Does the answer actually engage with the question's terms?
        let keywords: Vec<&str> = question
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .collect();
        if !keywords.is_empty() {
            let hits = keywords.iter().filter(|kw| answer.contains(**kw)).count();
            if hits as f64 / keywords.len() as f64 > 0.5 {
                confidence += 0.1;
            }
        }

        (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0
    }

    /// Extract thread identifiers referenced by an answer, in pattern
    /// order, deduplicated.
    pub fn extract_thread_references(&self, answer: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut refs = Vec::new();
        for pattern in &self.reference_patterns {
            for captures in pattern.captures_iter(answer) {
                if let Some(m) = captures.get(1) {
                    let id = m.as_str().to_string();
                    if seen.insert(id.clone()) {
                        refs.push(id);
                    }
                }
            }
        }
        refs
    }
}
