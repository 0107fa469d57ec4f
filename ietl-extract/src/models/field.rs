//! Field-name semantics
//!
//! Construct fields are free-form names chosen by the user ("User Story ID",
//! "stakeholderRole", "Lifecycle Phase"). Rule-based components need to know
//! what a field is *for*, so names are classified once into a closed set of
//! kinds. Classification looks at the words of the name, not its spelling.

/// What a construct field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// The record's own identifier, assigned by the job manager
    Identifier,
    /// The record's own confidence / match score, assigned by the scorer
    Score,
    Category,
    Role,
    Priority,
    Tags,
    Capability,
    Benefit,
    /// Where the record came from (transcript name)
    Source,
    /// Verbatim evidence from the transcript
    Snippet,
    /// Narrative text (story, statement, description, ...)
    FreeText,
    /// Anything else; only defaults or the AI can fill it
    Other,
}

impl FieldKind {
    /// Fields filled after extraction rather than by an extraction strategy
    pub fn is_system_filled(self) -> bool {
        matches!(self, FieldKind::Identifier | FieldKind::Score)
    }
}

/// Names of a record's own id slot; other "... ID" fields are user data
const RECORD_ID_KEYS: &[&str] = &[
    "id",
    "storyid",
    "userstoryid",
    "recordid",
    "reqid",
    "requirementid",
    "sourcestoryid",
];
/// Names of a record's own score slot; other "... Score" fields are user data
const RECORD_SCORE_KEYS: &[&str] = &["score", "confidence", "matchscore", "confidencescore"];

const CATEGORY_WORDS: &[&str] = &["category", "type", "theme", "epic", "classification", "area", "domain"];
const ROLE_WORDS: &[&str] = &["role", "stakeholder", "persona", "actor"];
const PRIORITY_WORDS: &[&str] = &["priority", "severity", "importance"];
const TAG_WORDS: &[&str] = &["tag", "tags", "label", "labels", "keywords"];
const CAPABILITY_WORDS: &[&str] = &["capability", "feature", "need", "want", "action"];
const BENEFIT_WORDS: &[&str] = &["benefit", "value", "goal", "reason", "outcome", "why"];
const SOURCE_WORDS: &[&str] = &["source", "file", "transcript", "origin", "document"];
const SNIPPET_WORDS: &[&str] = &["snippet", "quote", "evidence", "excerpt"];
const FREE_TEXT_WORDS: &[&str] = &[
    "story", "statement", "description", "text", "summary", "details", "notes", "requirement",
    "title", "narrative",
];

/// Classify a field name
pub fn classify_field(name: &str) -> FieldKind {
    let words = split_words(name);
    let has = |set: &[&str]| words.iter().any(|w| set.contains(&w.as_str()));

    let key = field_key(name);

    if words.last().map(String::as_str) == Some("id") {
        if RECORD_ID_KEYS.contains(&key.as_str()) {
            FieldKind::Identifier
        } else {
            FieldKind::Other
        }
    } else if has(&["score", "confidence"]) {
        if RECORD_SCORE_KEYS.contains(&key.as_str()) {
            FieldKind::Score
        } else {
            FieldKind::Other
        }
    } else if has(CATEGORY_WORDS) {
        FieldKind::Category
    } else if has(ROLE_WORDS) {
        FieldKind::Role
    } else if has(PRIORITY_WORDS) {
        FieldKind::Priority
    } else if has(TAG_WORDS) {
        FieldKind::Tags
    } else if has(CAPABILITY_WORDS) {
        FieldKind::Capability
    } else if has(BENEFIT_WORDS) {
        FieldKind::Benefit
    } else if has(SNIPPET_WORDS) {
        FieldKind::Snippet
    } else if has(SOURCE_WORDS) {
        FieldKind::Source
    } else if has(FREE_TEXT_WORDS) {
        FieldKind::FreeText
    } else {
        FieldKind::Other
    }
}

/// Normalized lookup key: lowercase alphanumerics only
///
/// `"User Story"`, `"user_story"` and `"userStory"` share the key `userstory`.
pub fn field_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split a field name into lowercase words on separators and camelCase humps
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
