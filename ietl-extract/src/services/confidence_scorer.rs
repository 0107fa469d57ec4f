//! Confidence Scorer
//!
//! Turns the evidence attached to a draft into a score in `[0, 1]`.
//!
//! - AI drafts use the service-reported confidence when it is a finite number
//!   in range, otherwise a fixed baseline pending manual review.
//! - Fallback drafts score by rule-match strength and are capped strictly
//!   below the AI baseline, so rule output never looks like confident AI output.

use crate::models::{ConfidenceEvidence, UserStoryDraft};

/// Score assigned to AI drafts without a usable reported confidence
pub const AI_BASELINE: f64 = 0.5;

/// Upper bound for fallback drafts
pub const FALLBACK_CEILING: f64 = 0.4;

/// Confidence Scorer
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    ai_baseline: f64,
    fallback_ceiling: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self {
            ai_baseline: AI_BASELINE,
            fallback_ceiling: FALLBACK_CEILING,
        }
    }
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score a draft
    pub fn score(&self, draft: &UserStoryDraft) -> f64 {
        self.score_evidence(&draft.evidence)
    }

    pub fn score_evidence(&self, evidence: &ConfidenceEvidence) -> f64 {
        match evidence {
            ConfidenceEvidence::Reported(Some(value)) if is_unit(*value) => *value,
            ConfidenceEvidence::Reported(_) => self.ai_baseline,
            ConfidenceEvidence::RuleMatch { matched, expected } => {
                if *expected == 0 {
                    return 0.0;
                }
                let strength = (*matched as f64 / *expected as f64).min(1.0);
                let score = strength * self.fallback_ceiling;
                if is_unit(score) {
                    score
                } else {
                    0.0
                }
            }
        }
    }
}

fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
