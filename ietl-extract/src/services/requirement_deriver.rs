//! Requirement Deriver
//!
//! Converts user stories into requirements under a second construct. Pure and
//! deterministic: the same stories and construct always produce the same
//! requirement set, `REQ-001` onward in story order.
//!
//! Each non-blank line of the construct pattern is one requirement template, so
//! a story yields one requirement per line. Placeholders resolve against the
//! story's fields by normalized name, then `{id}` / `{story}`, then any story
//! field of the same kind.

use crate::models::construct::render_template;
use crate::models::requirement::requirement_id;
use crate::models::{
    classify_field, field_key, Construct, ConstructInput, FieldKind, PriorityLevel, Requirement,
    UserStory,
};
use crate::services::schema_validator::{self, ValidationError};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

/// Template used when the construct pattern is blank
pub const BUILTIN_TEMPLATE: &str = "The system shall support {capability}";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error("no user stories supplied")]
    EmptyInput,

    #[error("invalid requirements construct: {0}")]
    InvalidConstruct(#[from] ValidationError),

    #[error("user story id appears more than once: {0}")]
    DuplicateStoryId(String),
}

/// Requirement Deriver
#[derive(Debug, Clone, Default)]
pub struct RequirementDeriver;

impl RequirementDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Validate `construct` and derive
    pub fn derive(
        &self,
        stories: &[UserStory],
        construct: &ConstructInput,
    ) -> Result<Vec<Requirement>, DerivationError> {
        if stories.is_empty() {
            return Err(DerivationError::EmptyInput);
        }
        let construct = schema_validator::validate(construct.clone())?;
        self.derive_validated(stories, &construct)
    }

    /// Derive with an already validated construct
    pub fn derive_validated(
        &self,
        stories: &[UserStory],
        construct: &Construct,
    ) -> Result<Vec<Requirement>, DerivationError> {
        if stories.is_empty() {
            return Err(DerivationError::EmptyInput);
        }

        let mut seen = HashSet::new();
        for story in stories {
            if !seen.insert(story.id.as_str()) {
                return Err(DerivationError::DuplicateStoryId(story.id.clone()));
            }
        }

        let templates: Vec<&str> = construct
            .pattern()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let rules = construct.parsed_priority_rules();

        let mut requirements = Vec::new();
        for story in stories {
            let view = StoryView::new(story);
            let priority_level = {
                let haystack = view.haystack();
                rules
                    .iter()
                    .find(|r| r.matches(&haystack))
                    .map(|r| r.level)
                    .unwrap_or_default()
            };

            let mut texts: Vec<String> = templates
                .iter()
                .map(|t| view.render(t))
                .filter(|t| !t.is_empty())
                .collect();
            if texts.is_empty() {
                texts.push(view.render(BUILTIN_TEMPLATE));
            }

            for text in texts {
                requirements.push(Requirement {
                    req_id: requirement_id(requirements.len() + 1),
                    requirement: text,
                    priority_level,
                    fields: extra_fields(construct, &view),
                    source_story_id: story.id.clone(),
                });
            }
        }

        tracing::debug!(
            stories = stories.len(),
            requirements = requirements.len(),
            "Derived requirements"
        );
        Ok(requirements)
    }
}

/// Fields carried on `Requirement` directly rather than in `fields`
fn is_reserved(field: &str) -> bool {
    let key = field_key(field);
    matches!(classify_field(field), FieldKind::Identifier | FieldKind::Priority)
        || key == "requirement"
        || key == "highlevelrequirement"
}

/// Remaining construct fields: same-named story field, default, generated
/// details, else empty
fn extra_fields(construct: &Construct, view: &StoryView<'_>) -> IndexMap<String, String> {
    construct
        .field_kinds()
        .filter(|(field, _)| !is_reserved(field))
        .map(|(field, kind)| {
            let value = view
                .field(field)
                .map(str::to_string)
                .or_else(|| construct.default_for(field).map(str::to_string))
                .or_else(|| match kind {
                    FieldKind::FreeText => Some(view.details()),
                    FieldKind::Score => Some(format!("{:.3}", view.story.confidence)),
                    _ => view.by_kind(kind).map(str::to_string),
                })
                .unwrap_or_default();
            (field.to_string(), value)
        })
        .collect()
}

/// Lookup helpers over one story
struct StoryView<'a> {
    story: &'a UserStory,
    by_key: IndexMap<String, &'a str>,
}

impl<'a> StoryView<'a> {
    fn new(story: &'a UserStory) -> Self {
        let by_key = story
            .fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (field_key(k), v.as_str()))
            .collect();
        Self { story, by_key }
    }

    fn field(&self, name: &str) -> Option<&'a str> {
        self.by_key.get(&field_key(name)).copied()
    }

    /// First non-system field of `kind`
    fn by_kind(&self, kind: FieldKind) -> Option<&'a str> {
        if kind.is_system_filled() || kind == FieldKind::Other {
            return None;
        }
        self.story
            .fields
            .iter()
            .find(|(k, v)| classify_field(k) == kind && !v.trim().is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Narrative text of the story, or its snippet
    fn text(&self) -> &'a str {
        self.by_kind(FieldKind::FreeText)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.story.source_snippet.as_str())
    }

    fn details(&self) -> String {
        format!("Derived from {}: {}", self.story.id, self.text())
    }

    /// Lowercased values and tags used for priority matching
    fn haystack(&self) -> String {
        let mut parts: Vec<&str> = self
            .story
            .fields
            .iter()
            .filter(|(k, _)| !classify_field(k).is_system_filled())
            .map(|(_, v)| v.as_str())
            .collect();
        parts.extend(self.story.tags.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if let Some(v) = self.field(name) {
            return Some(v.to_string());
        }
        match field_key(name).as_str() {
            "id" | "storyid" => return Some(self.story.id.clone()),
            "story" => return Some(self.text().to_string()),
            _ => {}
        }
        let kind = classify_field(name);
        self.by_kind(kind).map(str::to_string).or_else(|| match kind {
            FieldKind::Capability | FieldKind::FreeText => Some(self.text().to_string()),
            _ => None,
        })
    }

    fn render(&self, template: &str) -> String {
        let (text, _) = render_template(template, |name| self.resolve(name));
        if text.trim().is_empty() {
            String::new()
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;

    fn story(id: &str, fields: &[(&str, &str)], tags: &[&str]) -> UserStory {
        UserStory {
            id: id.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            confidence: 0.4,
            extraction_method: ExtractionMethod::Fallback,
            source_transcript_id: "t1".to_string(),
            source_snippet: "snippet".to_string(),
        }
    }

    fn construct(pattern: &str, rules: &[&str]) -> ConstructInput {
        ConstructInput {
            name: "Requirements".to_string(),
            output_fields: vec![
                "Req ID".into(),
                "Requirement".into(),
                "Priority Level".into(),
                "Req Details".into(),
                "Team".into(),
            ],
            pattern: pattern.to_string(),
            priority_rules: rules.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input() {
        let result = RequirementDeriver::new().derive(&[], &construct("", &[]));
        assert_eq!(result, Err(DerivationError::EmptyInput));
    }

    #[test]
    fn test_invalid_construct() {
        let mut c = construct("", &[]);
        c.name = " ".to_string();
        let stories = [story("US-001", &[("story", "x")], &[])];
        assert_eq!(
            RequirementDeriver::new().derive(&stories, &c),
            Err(DerivationError::InvalidConstruct(ValidationError::InvalidName))
        );
    }

    #[test]
    fn test_duplicate_story_ids_rejected() {
        let stories = [
            story("US-001", &[("story", "a")], &[]),
            story("US-001", &[("story", "b")], &[]),
        ];
        assert_eq!(
            RequirementDeriver::new().derive(&stories, &construct("", &[])),
            Err(DerivationError::DuplicateStoryId("US-001".to_string()))
        );
    }

    #[test]
    fn test_one_requirement_per_template_line() {
        let stories = [
            story("US-001", &[("User Story", "Route approvals"), ("Capability", "approval routing")], &[]),
            story("US-002", &[("User Story", "Tag assets"), ("Capability", "asset tagging")], &[]),
        ];
        let c = construct("The system shall support {capability}\n\n  Users can audit {Capability} for {id}", &[]);
        let reqs = RequirementDeriver::new().derive(&stories, &c).unwrap();

        assert_eq!(reqs.len(), 4);
        let ids: Vec<&str> = reqs.iter().map(|r| r.req_id.as_str()).collect();
        assert_eq!(ids, vec!["REQ-001", "REQ-002", "REQ-003", "REQ-004"]);
        assert_eq!(reqs[0].requirement, "The system shall support approval routing");
        assert_eq!(reqs[1].requirement, "Users can audit approval routing for US-001");
        assert_eq!(reqs[2].source_story_id, "US-002");
    }

    #[test]
    fn test_blank_pattern_uses_builtin_template() {
        let stories = [story("US-001", &[("story", "Route approvals")], &[])];
        let reqs = RequirementDeriver::new().derive(&stories, &construct("  ", &[])).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].requirement, "The system shall support Route approvals");
    }

    #[test]
    fn test_priority_first_match_wins() {
        let rules = ["HIGH: security, compliance", "LOW: compliance, nice to have"];
        let stories = [
            story("US-001", &[("story", "Compliance reporting")], &[]),
            story("US-002", &[("story", "Dark mode")], &["nice to have"]),
            story("US-003", &[("story", "Faster search")], &[]),
        ];
        let reqs = RequirementDeriver::new()
            .derive(&stories, &construct("", &rules))
            .unwrap();
        assert_eq!(reqs[0].priority_level, PriorityLevel::High);
        assert_eq!(reqs[1].priority_level, PriorityLevel::Low);
        assert_eq!(reqs[2].priority_level, PriorityLevel::Medium);
    }

    #[test]
    fn test_extra_fields_resolution() {
        let mut c = construct("", &[]);
        c.defaults.insert("Team".to_string(), "Platform".to_string());
        let stories = [
            story("US-001", &[("story", "Route approvals"), ("Team", "Ops")], &[]),
            story("US-002", &[("story", "Tag assets")], &[]),
        ];
        let reqs = RequirementDeriver::new().derive(&stories, &c).unwrap();

        let keys: Vec<&str> = reqs[0].fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Req Details", "Team"]);
        assert_eq!(reqs[0].fields["Team"], "Ops");
        assert_eq!(reqs[1].fields["Team"], "Platform");
        assert_eq!(reqs[0].fields["Req Details"], "Derived from US-001: Route approvals");
    }

    #[test]
    fn test_derive_is_idempotent() {
        let stories = [
            story("US-001", &[("story", "Route approvals")], &["workflow"]),
            story("US-002", &[("story", "Audit access")], &["security"]),
        ];
        let c = ConstructInput::default_requirements();
        let deriver = RequirementDeriver::new();
        assert_eq!(
            deriver.derive(&stories, &c).unwrap(),
            deriver.derive(&stories, &c).unwrap()
        );
    }
}
