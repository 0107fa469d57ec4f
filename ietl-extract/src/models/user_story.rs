//! Extracted records

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which strategy produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Ai,
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Ai => "ai",
            ExtractionMethod::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Some(ExtractionMethod::Ai),
            "fallback" => Some(ExtractionMethod::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw material the confidence scorer works from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfidenceEvidence {
    /// Value reported by the completion service, if any
    Reported(Option<f64>),
    /// Keyword hits of the winning fallback rule
    RuleMatch { matched: usize, expected: usize },
}

/// Candidate record before id assignment and scoring
#[derive(Debug, Clone, PartialEq)]
pub struct UserStoryDraft {
    /// Values for every non-system field of the construct, in declared order
    pub fields: IndexMap<String, String>,
    pub tags: Vec<String>,
    pub extraction_method: ExtractionMethod,
    pub evidence: ConfidenceEvidence,
    pub source_transcript_id: String,
    pub source_snippet: String,
}

/// Final extracted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    /// `US-001`, `US-002`, ... in transcript submission order
    pub id: String,
    /// Exactly one value per construct output field, in declared order
    pub fields: IndexMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
    pub source_transcript_id: String,
    pub source_snippet: String,
}

/// Format the sequential story id for a 1-based position
pub fn story_id(position: usize) -> String {
    format!("US-{:03}", position)
}

/// Sorted, deduplicated, lowercased tags
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}
