//! Deterministic rule-based extraction
//!
//! Used whenever the AI strategy is unavailable or unusable. Each sentence that
//! hits at least one keyword rule becomes a candidate; fields are populated by
//! their kind and fall back to construct defaults. A candidate with a field that
//! has neither a value nor a default is dropped.

use super::text::{benefit_clause, capability_clause, contains_word, role_phrase, split_sentences};
use crate::models::construct::render_template;
use crate::models::user_story::normalize_tags;
use crate::models::{
    classify_field, ConfidenceEvidence, Construct, ExtractionMethod, FieldKind,
    PriorityLevel, Transcript, UserStoryDraft,
};
use indexmap::IndexMap;

/// Keyword rule mapping sentence language to a category
#[derive(Debug)]
pub struct KeywordRule {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
    /// Hits needed for full rule strength
    pub expected: usize,
}

pub const RULES: &[KeywordRule] = &[
    KeywordRule {
        category: "workflow",
        keywords: &[
            "process", "approval", "approve", "workflow", "routing", "review", "sign-off",
            "escalation", "notification",
        ],
        expected: 3,
    },
    KeywordRule {
        category: "DAM",
        keywords: &["asset", "metadata", "tagging", "digital", "media", "version"],
        expected: 3,
    },
    KeywordRule {
        category: "integration",
        keywords: &["connect", "sync", "integration", "api", "import", "export"],
        expected: 3,
    },
    KeywordRule {
        category: "security",
        keywords: &["access", "permission", "compliance", "audit", "security", "encrypt"],
        expected: 3,
    },
];

const HIGH_PRIORITY_KEYWORDS: &[&str] = &["critical", "urgent", "security", "compliance"];
const LOW_PRIORITY_KEYWORDS: &[&str] = &["nice to have", "future", "optional"];

/// Keyword hits of one rule in one sentence
#[derive(Debug, Clone)]
pub struct RuleHit {
    pub rule: &'static KeywordRule,
    pub keywords: Vec<&'static str>,
}

/// All rules hit by a lowercased sentence, in table order
pub fn match_rules(sentence_lower: &str) -> Vec<RuleHit> {
    RULES
        .iter()
        .filter_map(|rule| {
            let keywords: Vec<&'static str> = rule
                .keywords
                .iter()
                .copied()
                .filter(|k| contains_word(sentence_lower, k))
                .collect();
            (!keywords.is_empty()).then_some(RuleHit { rule, keywords })
        })
        .collect()
}

/// Strongest hit; earlier rules win ties
fn strongest(hits: &[RuleHit]) -> Option<&RuleHit> {
    hits.iter().fold(None, |best: Option<&RuleHit>, hit| match best {
        Some(b) if b.keywords.len() >= hit.keywords.len() => Some(b),
        _ => Some(hit),
    })
}

/// Priority from the construct's own rules, then the fixed keyword lists
fn detect_priority(construct: &Construct, sentence_lower: &str) -> Option<String> {
    if let Some(rule) = construct
        .parsed_priority_rules()
        .into_iter()
        .find(|r| r.keywords.iter().any(|k| contains_word(sentence_lower, k)))
    {
        return Some(rule.level.as_str().to_string());
    }
    if HIGH_PRIORITY_KEYWORDS.iter().any(|k| contains_word(sentence_lower, k)) {
        return Some(PriorityLevel::High.as_str().to_string());
    }
    if LOW_PRIORITY_KEYWORDS.iter().any(|k| contains_word(sentence_lower, k)) {
        return Some(PriorityLevel::Low.as_str().to_string());
    }
    None
}

/// Values extracted from one sentence, keyed by field kind
struct SentenceFacts<'a> {
    sentence: &'a str,
    category: &'static str,
    role: Option<&'a str>,
    capability: &'a str,
    benefit: Option<&'a str>,
    priority: Option<String>,
    tags: Vec<String>,
    source: &'a str,
}

impl SentenceFacts<'_> {
    fn value_for(&self, kind: FieldKind) -> Option<String> {
        match kind {
            FieldKind::Category => Some(self.category.to_string()),
            FieldKind::Role => self.role.map(str::to_string),
            FieldKind::Priority => self.priority.clone(),
            FieldKind::Tags => Some(self.tags.join(", ")),
            FieldKind::Capability => Some(self.capability.to_string()),
            FieldKind::Benefit => self.benefit.map(str::to_string),
            FieldKind::Source => Some(self.source.to_string()),
            FieldKind::Snippet | FieldKind::FreeText => Some(self.sentence.to_string()),
            FieldKind::Identifier | FieldKind::Score | FieldKind::Other => None,
        }
    }
}

/// Extract drafts from a transcript using the keyword rules
pub fn extract(transcript: &Transcript, construct: &Construct) -> Vec<UserStoryDraft> {
    let mut drafts = Vec::new();

    for sentence in split_sentences(&transcript.text) {
        let lower = sentence.to_ascii_lowercase();
        let hits = match_rules(&lower);
        let Some(winner) = strongest(&hits) else {
            continue;
        };

        let role = role_phrase(sentence);
        let priority = detect_priority(construct, &lower);

        let mut tags: Vec<String> = hits
            .iter()
            .flat_map(|h| {
                std::iter::once(h.rule.category.to_string())
                    .chain(h.keywords.iter().map(|k| k.to_string()))
            })
            .collect();
        tags.extend(role.map(str::to_string));
        tags.extend(priority.clone());
        let tags = normalize_tags(tags);

        let facts = SentenceFacts {
            sentence,
            category: winner.rule.category,
            role,
            capability: capability_clause(sentence).unwrap_or(sentence),
            benefit: benefit_clause(sentence),
            priority,
            tags: tags.clone(),
            source: transcript.display_name(),
        };

        let Some(fields) = populate_fields(construct, &facts) else {
            tracing::debug!(
                transcript_id = %transcript.id,
                sentence = %sentence,
                "Fallback candidate dropped: required field without value or default"
            );
            continue;
        };

        drafts.push(UserStoryDraft {
            fields,
            tags,
            extraction_method: ExtractionMethod::Fallback,
            evidence: ConfidenceEvidence::RuleMatch {
                matched: winner.keywords.len(),
                expected: winner.rule.expected,
            },
            source_transcript_id: transcript.id.clone(),
            source_snippet: sentence.to_string(),
        });
    }

    drafts
}

/// Fill every non-system field, or `None` if one cannot be filled
fn populate_fields(construct: &Construct, facts: &SentenceFacts<'_>) -> Option<IndexMap<String, String>> {
    let mut fields = IndexMap::new();

    for (field, kind) in construct.field_kinds() {
        if kind.is_system_filled() {
            continue;
        }

        let extracted = if kind == FieldKind::FreeText {
            render_pattern(construct, facts).or_else(|| facts.value_for(kind))
        } else {
            facts.value_for(kind)
        };

        let value = extracted
            .filter(|v| !v.trim().is_empty())
            .or_else(|| construct.default_for(field).map(str::to_string))?;
        fields.insert(field.to_string(), value);
    }

    Some(fields)
}

/// Render the construct pattern when every placeholder resolves
///
/// Placeholders resolve by the kind their name implies (`{role}`, `{feature}`,
/// `{benefit}`), then by a same-named field default.
fn render_pattern(construct: &Construct, facts: &SentenceFacts<'_>) -> Option<String> {
    if construct.placeholders().is_empty() {
        return None;
    }
    let (text, complete) = render_template(construct.pattern(), |name| {
        let by_kind = match classify_field(name) {
            FieldKind::FreeText | FieldKind::Snippet => None,
            kind => facts.value_for(kind),
        };
        by_kind.or_else(|| {
            construct
                .find_field(name)
                .and_then(|f| construct.default_for(f))
                .map(str::to_string)
        })
    });
    complete.then_some(text)
}
