//! Construct: the user-defined output schema
//!
//! Callers hand in a [`ConstructInput`] (loosely shaped, straight off the wire).
//! Only the schema validator turns it into a [`Construct`], whose fields are
//! private so that every `Construct` in the system is known to be valid.

use crate::models::field::{classify_field, field_key, FieldKind};
use crate::models::requirement::PriorityLevel;
use crate::services::schema_validator::{self, ValidationError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unvalidated construct as supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructInput {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "output_schema", alias = "outputSchema", alias = "output_fields")]
    pub output_fields: Vec<String>,

    #[serde(default)]
    pub pattern: String,

    #[serde(default)]
    pub defaults: IndexMap<String, String>,

    #[serde(default, alias = "priority_rules")]
    pub priority_rules: Vec<String>,
}

impl ConstructInput {
    /// Built-in user story template, used when no construct is registered
    pub fn default_user_stories() -> Self {
        Self {
            name: "Default User Story Template".to_string(),
            description: Some(
                "Standard template for extracting user stories from interview transcripts"
                    .to_string(),
            ),
            output_fields: [
                "User Story ID",
                "User Story",
                "Team",
                "Category",
                "Lifecycle Phase",
                "Capability",
                "Priority",
                "Source",
                "Snippet",
                "Match Score",
                "Tags",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            pattern: "As a {role}, I want {feature} so that {benefit}".to_string(),
            defaults: [
                ("Team", "Product"),
                ("Category", "Workflow"),
                ("Lifecycle Phase", "Execution"),
                ("Priority", "MEDIUM"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            priority_rules: vec![
                "High: Security, compliance, critical business functions".to_string(),
                "Medium: User experience, efficiency improvements".to_string(),
                "Low: Nice-to-have features, optimizations".to_string(),
            ],
        }
    }

    /// Built-in requirements template
    pub fn default_requirements() -> Self {
        Self {
            name: "Default Requirements Template".to_string(),
            description: Some("High-level requirements derived from user stories".to_string()),
            output_fields: ["Req ID", "Requirement", "Priority Level", "Req Details"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pattern: "The system shall support {capability}".to_string(),
            defaults: IndexMap::new(),
            priority_rules: vec![
                "HIGH: critical, urgent, security, compliance, revenue, customer, core".to_string(),
                "LOW: nice to have, future, enhancement, optional, improvement".to_string(),
            ],
        }
    }
}

/// Validated construct
///
/// Immutable once built. Serializes in the same shape as [`ConstructInput`] and
/// re-validates on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConstructInput", into = "ConstructInput")]
pub struct Construct {
    name: String,
    description: Option<String>,
    output_fields: Vec<String>,
    pattern: String,
    defaults: IndexMap<String, String>,
    priority_rules: Vec<String>,
}

impl Construct {
    /// Assemble from already-normalized parts (schema validator only)
    pub(crate) fn from_validated(
        name: String,
        description: Option<String>,
        output_fields: Vec<String>,
        pattern: String,
        defaults: IndexMap<String, String>,
        priority_rules: Vec<String>,
    ) -> Self {
        Self {
            name,
            description,
            output_fields,
            pattern,
            defaults,
            priority_rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Field names in declared order
    pub fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn defaults(&self) -> &IndexMap<String, String> {
        &self.defaults
    }

    pub fn priority_rules(&self) -> &[String] {
        &self.priority_rules
    }

    /// Field names paired with their kind, in declared order
    pub fn field_kinds(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.output_fields
            .iter()
            .map(|f| (f.as_str(), classify_field(f)))
    }

    /// Default for `field`, ignoring blank defaults
    pub fn default_for(&self, field: &str) -> Option<&str> {
        self.defaults
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Placeholder names referenced by the pattern, in order of appearance
    pub fn placeholders(&self) -> Vec<String> {
        extract_placeholders(&self.pattern)
    }

    /// Priority rules that parse as `LEVEL: keyword, keyword`
    ///
    /// Malformed rules are hints only and are skipped.
    pub fn parsed_priority_rules(&self) -> Vec<PriorityRule> {
        self.priority_rules
            .iter()
            .filter_map(|r| {
                let parsed = PriorityRule::parse(r);
                if parsed.is_none() {
                    tracing::debug!(rule = %r, "Ignoring unparsable priority rule");
                }
                parsed
            })
            .collect()
    }

    /// Look up a field by normalized key ("user story" == "userStory")
    pub fn find_field(&self, name: &str) -> Option<&str> {
        let key = field_key(name);
        self.output_fields
            .iter()
            .find(|f| field_key(f) == key)
            .map(String::as_str)
    }
}

impl TryFrom<ConstructInput> for Construct {
    type Error = ValidationError;

    fn try_from(input: ConstructInput) -> Result<Self, Self::Error> {
        schema_validator::validate(input)
    }
}

impl From<Construct> for ConstructInput {
    fn from(c: Construct) -> Self {
        Self {
            name: c.name,
            description: c.description,
            output_fields: c.output_fields,
            pattern: c.pattern,
            defaults: c.defaults,
            priority_rules: c.priority_rules,
        }
    }
}

/// One `LEVEL: keyword, keyword` priority hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityRule {
    pub level: PriorityLevel,
    /// Lowercased, trimmed, non-empty
    pub keywords: Vec<String>,
}

impl PriorityRule {
    pub fn parse(rule: &str) -> Option<Self> {
        let (level, keywords) = rule.split_once(':')?;
        let level = PriorityLevel::parse(level)?;
        let keywords: Vec<String> = keywords
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return None;
        }
        Some(Self { level, keywords })
    }

    /// True when any keyword occurs in `haystack` (already lowercased)
    pub fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Registered construct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructRecord {
    pub id: Uuid,
    pub construct: Construct,
    pub created_at: DateTime<Utc>,
}

impl ConstructRecord {
    pub fn new(construct: Construct) -> Self {
        Self {
            id: Uuid::new_v4(),
            construct,
            created_at: Utc::now(),
        }
    }
}

/// `{name}` placeholders in a template, trimmed, skipping empty braces
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = after[..close].trim();
                if !name.is_empty() && !name.contains('{') {
                    names.push(name.to_string());
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

/// Fill `{name}` placeholders using `resolve`
///
/// Unresolved placeholders render as empty. Returns the text and whether every
/// placeholder resolved.
pub fn render_template<F>(template: &str, mut resolve: F) -> (String, bool)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut complete = true;
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = after[..close].trim();
                match resolve(name).filter(|v| !v.trim().is_empty()) {
                    Some(value) => out.push_str(value.trim()),
                    None => complete = false,
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    (collapse_whitespace(&out), complete)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let (text, complete) = render_template("As a {role}, I want {feature}", |name| {
            (name == "role").then(|| "manager".to_string())
        });
        assert_eq!(text, "As a manager, I want");
        assert!(!complete);

        let (text, complete) = render_template("{a} and {b} {", |name| Some(name.to_uppercase()));
        assert_eq!(text, "A and B {");
        assert!(complete);
    }

    #[test]
    fn test_default_templates_are_valid() {
        let stories = Construct::try_from(ConstructInput::default_user_stories()).unwrap();
        assert_eq!(stories.output_fields().len(), 11);
        assert_eq!(stories.default_for("Team"), Some("Product"));
        assert_eq!(stories.default_for("Priority"), Some(PriorityLevel::Medium.as_str()));
        assert_eq!(stories.placeholders(), vec!["role", "feature", "benefit"]);

        let reqs = Construct::try_from(ConstructInput::default_requirements()).unwrap();
        assert_eq!(reqs.parsed_priority_rules().len(), 2);
    }

    #[test]
    fn test_snake_case_aliases_accepted() {
        let json = r#"{
            "name": "n",
            "output_schema": ["a", "b"],
            "pattern": "",
            "defaults": {"b": "x"},
            "priority_rules": ["HIGH: a"]
        }"#;
        let input: ConstructInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.output_fields, vec!["a", "b"]);
        assert_eq!(input.priority_rules.len(), 1);
    }

    #[test]
    fn test_deserializing_invalid_construct_fails() {
        let json = r#"{"name": "", "outputFields": ["a"]}"#;
        assert!(serde_json::from_str::<Construct>(json).is_err());
    }

    #[test]
    fn test_serialized_construct_keeps_field_order() {
        let input = ConstructInput {
            name: "Order".to_string(),
            output_fields: vec!["z".into(), "a".into(), "m".into()],
            ..Default::default()
        };
        let construct = Construct::try_from(input).unwrap();
        let json = serde_json::to_string(&construct).unwrap();
        let back: Construct = serde_json::from_str(&json).unwrap();
        assert_eq!(back.output_fields(), &["z", "a", "m"]);
    }

    #[test]
    fn test_priority_rule_parsing() {
        let rule = PriorityRule::parse("High: Security, compliance ,").unwrap();
        assert_eq!(rule.level, PriorityLevel::High);
        assert_eq!(rule.keywords, vec!["security", "compliance"]);
        assert!(rule.matches("needs compliance reporting"));

        assert!(PriorityRule::parse("no colon here").is_none());
        assert!(PriorityRule::parse("URGENT: x").is_none());
        assert!(PriorityRule::parse("LOW:   ").is_none());
    }

    #[test]
    fn test_placeholder_extraction() {
        assert_eq!(
            extract_placeholders("As a { role }, I want {feature}{} so {benefit"),
            vec!["role", "feature"]
        );
        assert!(extract_placeholders("plain text").is_empty());
    }

    #[test]
    fn test_find_field_is_case_and_space_insensitive() {
        let construct = Construct::try_from(ConstructInput::default_user_stories()).unwrap();
        assert_eq!(construct.find_field("user_story"), Some("User Story"));
        assert_eq!(construct.find_field("matchScore"), Some("Match Score"));
        assert_eq!(construct.find_field("nope"), None);
    }
}
