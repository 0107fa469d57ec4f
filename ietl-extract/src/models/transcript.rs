//! Decoded transcript text plus metadata

use serde::{Deserialize, Serialize};

/// One interview transcript, already decoded to text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// Caller-chosen identifier, unique within a job
    pub id: String,
    /// Display name (usually the original file name)
    #[serde(default)]
    pub name: String,
    pub text: String,
    /// Size of the original bytes; defaults to the text length
    #[serde(default)]
    pub size_bytes: u64,
}

impl Transcript {
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            name: name.into(),
            size_bytes: text.len() as u64,
            text,
        }
    }

    /// Name for display; the id when no name was given
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
