//! Tunables for analysis scoring and validation strictness.

use refit_core::{ComplexityTier, PatternCategory, PatternCounts};
use serde::{Deserialize, Serialize};

/// Per-category weights of the complexity score.
///
/// Weights are unsigned, so the score never decreases when a pattern is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityWeights {
    #[serde(default = "default_state_weight")]
    pub state_binding: u32,
    #[serde(default = "default_effect_weight")]
    pub side_effect: u32,
    #[serde(default = "default_handler_weight")]
    pub event_handler: u32,
    #[serde(default = "default_transformation_weight")]
    pub data_transformation: u32,
    #[serde(default = "default_validation_weight")]
    pub validation_rule: u32,
    #[serde(default = "default_external_weight")]
    pub external_call: u32,
}

fn default_state_weight() -> u32 {
    1
}

fn default_effect_weight() -> u32 {
    3
}

fn default_handler_weight() -> u32 {
    1
}

fn default_transformation_weight() -> u32 {
    1
}

fn default_validation_weight() -> u32 {
    2
}

fn default_external_weight() -> u32 {
    5
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            state_binding: default_state_weight(),
            side_effect: default_effect_weight(),
            event_handler: default_handler_weight(),
            data_transformation: default_transformation_weight(),
            validation_rule: default_validation_weight(),
            external_call: default_external_weight(),
        }
    }
}

impl ComplexityWeights {
    /// Weight of one category.
    pub fn weight(&self, category: PatternCategory) -> u32 {
        match category {
            PatternCategory::StateBinding => self.state_binding,
            PatternCategory::SideEffect => self.side_effect,
            PatternCategory::EventHandler => self.event_handler,
            PatternCategory::DataTransformation => self.data_transformation,
            PatternCategory::ValidationRule => self.validation_rule,
            PatternCategory::ExternalCall => self.external_call,
        }
    }

    /// `Σ weight · count` over all categories.
    pub fn score(&self, counts: &PatternCounts) -> u32 {
        PatternCategory::ALL
            .iter()
            .map(|c| self.weight(*c).saturating_mul(counts.get(*c) as u32))
            .fold(0u32, |acc, v| acc.saturating_add(v))
    }
}

/// Lower bounds (inclusive) of the non-simple tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(default = "default_moderate")]
    pub moderate: u32,
    #[serde(default = "default_complex")]
    pub complex: u32,
    #[serde(default = "default_critical")]
    pub critical: u32,
}

fn default_moderate() -> u32 {
    5
}

fn default_complex() -> u32 {
    13
}

fn default_critical() -> u32 {
    25
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            moderate: default_moderate(),
            complex: default_complex(),
            critical: default_critical(),
        }
    }
}

impl TierThresholds {
    /// Map a score onto a tier.
    pub fn tier_for(&self, score: u32) -> ComplexityTier {
        if score >= self.critical {
            ComplexityTier::Critical
        } else if score >= self.complex {
            ComplexityTier::Complex
        } else if score >= self.moderate {
            ComplexityTier::Moderate
        } else {
            ComplexityTier::Simple
        }
    }

    /// Whether the bounds are strictly increasing.
    pub fn is_ordered(&self) -> bool {
        self.moderate < self.complex && self.complex < self.critical
    }
}

/// Analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub weights: ComplexityWeights,
    #[serde(default)]
    pub thresholds: TierThresholds,
    /// Run the naming-convention fallbacks for handlers and external calls.
    #[serde(default = "default_true")]
    pub heuristic_fallbacks: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            weights: ComplexityWeights::default(),
            thresholds: TierThresholds::default(),
            heuristic_fallbacks: true,
        }
    }
}

impl AnalyzerConfig {
    /// Score and tier for a set of counts.
    pub fn classify(&self, counts: &PatternCounts) -> (u32, ComplexityTier) {
        let score = self.weights.score(counts);
        (score, self.thresholds.tier_for(score))
    }
}

/// Validator strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum score for a valid verdict.
    #[serde(default = "default_min_score")]
    pub min_score: u8,
    /// Treat medium-severity issues as failures.
    #[serde(default)]
    pub strict: bool,
}

fn default_min_score() -> u8 {
    70
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            strict: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_plus_external_call_is_moderate() {
        let counts = PatternCounts {
            state_bindings: 1,
            external_calls: 1,
            ..Default::default()
        };
        let (score, tier) = AnalyzerConfig::default().classify(&counts);
        assert_eq!(score, 6);
        assert_eq!(tier, ComplexityTier::Moderate);
    }

    #[test]
    fn test_score_is_monotonic() {
        let weights = ComplexityWeights::default();
        let mut counts = PatternCounts::default();
        let mut last = weights.score(&counts);
        for _ in 0..5 {
            counts.side_effects += 1;
            counts.event_handlers += 1;
            let next = weights.score(&counts);
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let t = TierThresholds::default();
        assert!(t.is_ordered());
        assert_eq!(t.tier_for(4), ComplexityTier::Simple);
        assert_eq!(t.tier_for(5), ComplexityTier::Moderate);
        assert_eq!(t.tier_for(13), ComplexityTier::Complex);
        assert_eq!(t.tier_for(25), ComplexityTier::Critical);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: AnalyzerConfig =
            serde_json::from_str(r#"{"weights": {"external_call": 8}}"#).unwrap();
        assert_eq!(cfg.weights.external_call, 8);
        assert_eq!(cfg.weights.side_effect, 3);
        assert!(cfg.heuristic_fallbacks);
    }
}
