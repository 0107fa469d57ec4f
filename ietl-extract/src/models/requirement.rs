//! Derived requirement records

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Low => "LOW",
            PriorityLevel::Medium => "MEDIUM",
            PriorityLevel::High => "HIGH",
        }
    }

    /// Case-insensitive parse of `low`/`medium`/`high`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(PriorityLevel::Low),
            "MEDIUM" => Some(PriorityLevel::Medium),
            "HIGH" => Some(PriorityLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requirement derived from a user story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// `REQ-001`, `REQ-002`, ... in derivation order
    pub req_id: String,
    pub requirement: String,
    pub priority_level: PriorityLevel,
    /// Remaining fields of the requirements construct, in declared order
    pub fields: IndexMap<String, String>,
    /// Id of the originating user story
    pub source_story_id: String,
}

pub fn requirement_id(position: usize) -> String {
    format!("REQ-{:03}", position)
}
