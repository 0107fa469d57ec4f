//! Parsing completion output into drafts
//!
//! Accepted shapes (optionally wrapped in a markdown code fence):
//!
//! ```text
//! [{"records": [{"field": "value"}], "confidence": 0.8, "snippet": "..."}]
//! {"records": [...], "confidence": 0.8}
//! [{"field": "value"}, ...]
//! ```
//!
//! Non-string scalar values are stringified; arrays of scalars are joined with
//! `", "`. Parsing is all-or-nothing for the envelope but per-record for
//! validity: a record missing a non-defaulted field is dropped.

use super::text::{locate, prefix_chars};
use crate::models::user_story::normalize_tags;
use crate::models::{
    field_key, ConfidenceEvidence, Construct, ExtractionMethod, FieldKind, Transcript,
    UserStoryDraft,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

/// Longest snippet taken from the start of a transcript when nothing better is known
const FALLBACK_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response is not JSON: {0}")]
    NotJson(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// One record as returned by the service, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCandidate {
    pub values: IndexMap<String, String>,
    pub confidence: Option<f64>,
    pub snippet: Option<String>,
}

/// Parse raw completion text into candidates
pub fn parse_response(raw: &str) -> Result<Vec<RawCandidate>, ParseError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| ParseError::NotJson(e.to_string()))?;

    match value {
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    Value::Object(obj) if obj.contains_key("records") => {
                        out.extend(parse_group(obj)?);
                    }
                    Value::Object(obj) => out.push(RawCandidate {
                        values: record_values(&obj),
                        ..Default::default()
                    }),
                    other => {
                        return Err(ParseError::UnexpectedShape(format!(
                            "array element is {}",
                            json_type(&other)
                        )))
                    }
                }
            }
            Ok(out)
        }
        Value::Object(obj) if obj.contains_key("records") => parse_group(obj),
        other => Err(ParseError::UnexpectedShape(format!(
            "top level is {}",
            json_type(&other)
        ))),
    }
}

fn parse_group(mut obj: Map<String, Value>) -> Result<Vec<RawCandidate>, ParseError> {
    let confidence = obj.get("confidence").and_then(number_like);
    let snippet = obj
        .get("snippet")
        .and_then(Value::as_str)
        .map(str::to_string);

    let records = match obj.remove("records") {
        Some(Value::Array(records)) => records,
        Some(other) => {
            return Err(ParseError::UnexpectedShape(format!(
                "\"records\" is {}",
                json_type(&other)
            )))
        }
        None => Vec::new(),
    };

    Ok(records
        .into_iter()
        .filter_map(|r| match r {
            Value::Object(record) => Some(RawCandidate {
                values: record_values(&record),
                confidence,
                snippet: snippet.clone(),
            }),
            _ => None,
        })
        .collect())
}

fn record_values(record: &Map<String, Value>) -> IndexMap<String, String> {
    record
        .iter()
        .filter_map(|(k, v)| scalar_text(v).map(|s| (k.clone(), s)))
        .collect()
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn number_like(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove a surrounding ```json ... ``` fence, if present
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = match inner.find('\n') {
        Some(nl) => &inner[nl + 1..],
        None => inner,
    };
    inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}

/// Validate candidates against the construct and build drafts
///
/// Response keys match construct fields exactly or by normalized key. Blank
/// values count as absent. Defaults fill absent defaulted fields; a candidate
/// still missing a field is dropped.
pub fn build_drafts(
    candidates: Vec<RawCandidate>,
    transcript: &Transcript,
    construct: &Construct,
) -> Vec<UserStoryDraft> {
    let mut drafts = Vec::with_capacity(candidates.len());

    'candidates: for candidate in candidates {
        let normalized: IndexMap<String, &str> = candidate
            .values
            .iter()
            .map(|(k, v)| (field_key(k), v.as_str()))
            .collect();

        let mut fields = IndexMap::new();
        let mut tags = Vec::new();
        let mut snippet_field = None;
        let mut free_text = None;

        for (field, kind) in construct.field_kinds() {
            if kind.is_system_filled() {
                continue;
            }
            let returned = candidate
                .values
                .get(field)
                .map(String::as_str)
                .or_else(|| normalized.get(&field_key(field)).copied())
                .map(str::trim)
                .filter(|v| !v.is_empty());

            let value = match returned.or_else(|| construct.default_for(field)) {
                Some(v) => v.to_string(),
                None => {
                    tracing::debug!(
                        transcript_id = %transcript.id,
                        field = %field,
                        "AI candidate dropped: missing required field"
                    );
                    continue 'candidates;
                }
            };

            match kind {
                FieldKind::Tags => tags.extend(value.split(',').map(str::to_string)),
                FieldKind::Category | FieldKind::Priority => tags.push(value.clone()),
                FieldKind::Snippet => snippet_field = Some(value.clone()),
                FieldKind::FreeText if free_text.is_none() => free_text = Some(value.clone()),
                _ => {}
            }
            fields.insert(field.to_string(), value);
        }

        let source_snippet = [candidate.snippet.as_deref(), snippet_field.as_deref(), free_text.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|s| locate(&transcript.text, s))
            .unwrap_or_else(|| prefix_chars(transcript.text.trim(), FALLBACK_SNIPPET_CHARS))
            .to_string();

        drafts.push(UserStoryDraft {
            fields,
            tags: normalize_tags(tags),
            extraction_method: ExtractionMethod::Ai,
            evidence: ConfidenceEvidence::Reported(candidate.confidence),
            source_transcript_id: transcript.id.clone(),
            source_snippet,
        });
    }

    drafts
}
