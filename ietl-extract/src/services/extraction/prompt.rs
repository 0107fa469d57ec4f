//! Prompt text for the completion service

use super::completion::CompletionRequest;
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You extract structured records from interview transcripts. \
Answer with JSON only, no prose and no markdown.";

/// User message for one transcript
pub fn build_user_prompt(request: &CompletionRequest) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Extract every distinct user need from the transcript below.");
    let _ = writeln!(prompt, "Each record must have exactly these fields, in this order:");
    for field in &request.output_fields {
        let _ = writeln!(prompt, "- {}", field);
    }

    if !request.pattern.trim().is_empty() {
        let _ = writeln!(prompt, "\nWrite narrative fields following this pattern: {}", request.pattern);
    }

    if !request.defaults.is_empty() {
        let _ = writeln!(prompt, "\nWhen the transcript says nothing about a field, use its default:");
        for (field, value) in &request.defaults {
            let _ = writeln!(prompt, "- {}: {}", field, value);
        }
    }

    if !request.priority_rules.is_empty() {
        let _ = writeln!(prompt, "\nClassify priority using these rules, first match wins:");
        for rule in &request.priority_rules {
            let _ = writeln!(prompt, "- {}", rule);
        }
    }

    let _ = writeln!(
        prompt,
        "\nRespond with a JSON array. Each element is an object with:\n\
         - \"records\": array of objects mapping each field name to a string value\n\
         - \"confidence\": number between 0 and 1\n\
         - \"snippet\": the exact transcript sentence the records came from"
    );

    let _ = writeln!(prompt, "\nTRANSCRIPT:\n{}", request.transcript_text);
    prompt
}
