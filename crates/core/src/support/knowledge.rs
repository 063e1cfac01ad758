//! Keyword knowledge base.
//!
//! Entries are checked in list order and the first one whose terms all occur in the query
//! wins, so the list doubles as a topic priority ordering (password reset outranks payment
//! failure). A single-term entry is a plain case-insensitive substring rule.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MATCH_CONFIDENCE: f64 = 0.9;
pub const FALLBACK_ANSWER: &str = "No matching FAQ found";
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub topic: String,
    pub terms: Vec<String>,
    pub answer: String,
    #[serde(default = "default_match_confidence")]
    pub confidence: f64,
}

fn default_match_confidence() -> f64 {
    DEFAULT_MATCH_CONFIDENCE
}

impl KnowledgeEntry {
    pub fn new(topic: &str, terms: &[&str], answer: &str) -> Self {
        Self {
            topic: topic.to_string(),
            terms: terms.iter().map(|term| term.to_string()).collect(),
            answer: answer.to_string(),
            confidence: DEFAULT_MATCH_CONFIDENCE,
        }
    }

    fn matches(&self, normalized_query: &str) -> bool {
        self.terms.iter().all(|term| normalized_query.contains(term.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub answer: String,
    pub confidence: f64,
}

impl KnowledgeBaseMatch {
    pub fn fallback() -> Self {
        Self { topic: None, answer: FALLBACK_ANSWER.to_string(), confidence: FALLBACK_CONFIDENCE }
    }

    pub fn is_fallback(&self) -> bool {
        self.topic.is_none()
    }
}

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("could not read knowledge base `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse knowledge base `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid knowledge base entry `{topic}`: {reason}")]
    InvalidEntry { topic: String, reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self { entries: default_entries().into_iter().map(normalize_entry).collect() }
    }
}

impl KnowledgeBase {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Result<Self, KnowledgeBaseError> {
        let entries = entries
            .into_iter()
            .map(|entry| validate_entry(normalize_entry(entry)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Loads an ordered JSON array of entries; file order is match priority.
    pub fn from_json_file(path: &Path) -> Result<Self, KnowledgeBaseError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| KnowledgeBaseError::Read { path: path.to_path_buf(), source })?;
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(&raw)
            .map_err(|source| KnowledgeBaseError::Parse { path: path.to_path_buf(), source })?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn match_query(&self, query: &str) -> KnowledgeBaseMatch {
        let normalized = query.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.matches(&normalized))
            .map(|entry| KnowledgeBaseMatch {
                topic: Some(entry.topic.clone()),
                answer: entry.answer.clone(),
                confidence: entry.confidence,
            })
            .unwrap_or_else(KnowledgeBaseMatch::fallback)
    }
}

fn normalize_entry(mut entry: KnowledgeEntry) -> KnowledgeEntry {
    entry.terms = entry
        .terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect();
    entry
}

fn validate_entry(entry: KnowledgeEntry) -> Result<KnowledgeEntry, KnowledgeBaseError> {
    if entry.terms.is_empty() {
        return Err(KnowledgeBaseError::InvalidEntry {
            topic: entry.topic,
            reason: "at least one non-blank term is required".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&entry.confidence) {
        return Err(KnowledgeBaseError::InvalidEntry {
            topic: entry.topic,
            reason: format!("confidence {} is outside 0..=1", entry.confidence),
        });
    }
    if entry.answer.trim().is_empty() {
        return Err(KnowledgeBaseError::InvalidEntry {
            topic: entry.topic,
            reason: "answer must not be blank".to_string(),
        });
    }
    Ok(entry)
}

fn default_entries() -> Vec<KnowledgeEntry> {
    vec![
        KnowledgeEntry::new(
            "reset_password",
            &["reset", "password"],
            "To reset your password, click 'Forgot Password' on the login screen and follow the email instructions.",
        ),
        KnowledgeEntry::new(
            "payment_failed",
            &["payment", "failed"],
            "Payment failures usually come from an expired card, insufficient funds, or a bank block. Try a different card or contact your bank.",
        ),
        KnowledgeEntry::new(
            "order_status",
            &["order", "status"],
            "Check your order status in the account dashboard or use the tracking link in your confirmation email.",
        ),
        KnowledgeEntry::new(
            "app_crash",
            &["app", "crash"],
            "Clear the app cache and update to the latest version. If it keeps crashing, contact support with your device details.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{
        KnowledgeBase, KnowledgeBaseError, KnowledgeEntry, FALLBACK_ANSWER, FALLBACK_CONFIDENCE,
    };

    #[test]
    fn password_reset_question_matches_with_high_confidence() {
        let kb = KnowledgeBase::default();
        let found = kb.match_query("How do I reset my password?");

        assert_eq!(found.topic.as_deref(), Some("reset_password"));
        assert_eq!(found.confidence, 0.9);
    }

    #[test]
    fn matching_ignores_case() {
        let kb = KnowledgeBase::default();
        assert_eq!(
            kb.match_query("MY PAYMENT FAILED 3 TIMES").topic.as_deref(),
            Some("payment_failed")
        );
    }

    #[test]
    fn unmatched_query_falls_back_to_low_confidence() {
        let kb = KnowledgeBase::default();
        let found = kb.match_query("Can I change my invoice address?");

        assert!(found.is_fallback());
        assert_eq!(found.answer, FALLBACK_ANSWER);
        assert_eq!(found.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn earlier_entry_wins_when_several_match() {
        let kb = KnowledgeBase::default();
        let found = kb.match_query("payment failed after I tried to reset my password");
        assert_eq!(found.topic.as_deref(), Some("reset_password"));

        let reordered = KnowledgeBase::new(vec![
            KnowledgeEntry::new("payment", &["payment"], "payment answer"),
            KnowledgeEntry::new("password", &["password"], "password answer"),
        ])
        .expect("valid kb");
        assert_eq!(
            reordered.match_query("payment failed after I tried to reset my password").answer,
            "payment answer"
        );
    }

    #[test]
    fn matching_is_pure() {
        let kb = KnowledgeBase::default();
        let query = "App crashes on startup";
        assert_eq!(kb.match_query(query), kb.match_query(query));
    }

    #[test]
    fn entries_without_terms_are_rejected() {
        let error = KnowledgeBase::new(vec![KnowledgeEntry::new("empty", &["  "], "answer")])
            .expect_err("blank terms");
        assert!(matches!(error, KnowledgeBaseError::InvalidEntry { ref topic, .. } if topic == "empty"));
    }

    #[test]
    fn json_file_preserves_entry_order_and_default_confidence() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("kb.json");
        fs::write(
            &path,
            r#"[
                {"topic": "refund_policy", "terms": ["Refund"], "answer": "Refunds take 5 days.", "confidence": 0.85},
                {"topic": "shipping", "terms": ["ship"], "answer": "We ship in 2 days."}
            ]"#,
        )
        .expect("write kb");

        let kb = KnowledgeBase::from_json_file(&path).expect("load kb");
        assert_eq!(kb.entries()[0].topic, "refund_policy");
        assert_eq!(kb.entries()[0].terms, vec!["refund".to_string()]);
        assert_eq!(kb.entries()[1].confidence, 0.9);
        assert_eq!(kb.match_query("when will you ship my refund?").confidence, 0.85);
    }
}
