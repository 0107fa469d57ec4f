//! Schema validation
//!
//! The only way to obtain a [`Construct`]. Pure: no I/O, no logging side
//! effects beyond debug traces.

use crate::models::{Construct, ConstructInput, Transcript};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("construct name must not be empty")]
    InvalidName,

    #[error("construct must declare at least one output field")]
    EmptySchema,

    #[error("output field at position {0} is blank")]
    InvalidFieldName(usize),

    #[error("duplicate output field: {0}")]
    DuplicateField(String),

    #[error("default given for undeclared field: {0}")]
    OrphanDefault(String),

    #[error("at least one transcript is required")]
    NoTranscripts,

    #[error("transcript at position {0} has a blank id")]
    InvalidTranscriptId(usize),

    #[error("duplicate transcript id: {0}")]
    DuplicateTranscript(String),
}

impl ValidationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidName => "InvalidName",
            ValidationError::EmptySchema => "EmptySchema",
            ValidationError::InvalidFieldName(_) => "InvalidFieldName",
            ValidationError::DuplicateField(_) => "DuplicateField",
            ValidationError::OrphanDefault(_) => "OrphanDefault",
            ValidationError::NoTranscripts => "NoTranscripts",
            ValidationError::InvalidTranscriptId(_) => "InvalidTranscriptId",
            ValidationError::DuplicateTranscript(_) => "DuplicateTranscript",
        }
    }
}

/// Validate and normalize a construct
///
/// Trims the name, field names, default keys and priority rules. Field names
/// are compared case-sensitively after trimming.
pub fn validate(input: ConstructInput) -> Result<Construct, ValidationError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::InvalidName);
    }

    if input.output_fields.is_empty() {
        return Err(ValidationError::EmptySchema);
    }

    let mut seen = HashSet::new();
    let mut output_fields = Vec::with_capacity(input.output_fields.len());
    for (position, field) in input.output_fields.iter().enumerate() {
        let field = field.trim();
        if field.is_empty() {
            return Err(ValidationError::InvalidFieldName(position));
        }
        if !seen.insert(field.to_string()) {
            return Err(ValidationError::DuplicateField(field.to_string()));
        }
        output_fields.push(field.to_string());
    }

    let mut defaults = IndexMap::with_capacity(input.defaults.len());
    for (key, value) in input.defaults {
        let key = key.trim().to_string();
        if !seen.contains(&key) {
            return Err(ValidationError::OrphanDefault(key));
        }
        defaults.insert(key, value);
    }

    let priority_rules = input
        .priority_rules
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(Construct::from_validated(
        name,
        description,
        output_fields,
        input.pattern,
        defaults,
        priority_rules,
    ))
}

/// Check a transcript batch: non-empty, ids present and unique
pub fn validate_transcripts(transcripts: &[Transcript]) -> Result<(), ValidationError> {
    if transcripts.is_empty() {
        return Err(ValidationError::NoTranscripts);
    }
    let mut seen = HashSet::new();
    for (position, t) in transcripts.iter().enumerate() {
        if t.id.trim().is_empty() {
            return Err(ValidationError::InvalidTranscriptId(position));
        }
        if !seen.insert(t.id.as_str()) {
            return Err(ValidationError::DuplicateTranscript(t.id.clone()));
        }
    }
    Ok(())
}
