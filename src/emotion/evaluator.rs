use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Emotion, EmotionScores};

/// Confidence a target label must strictly exceed to count as matched.
pub const MATCH_THRESHOLD: f32 = 0.6;

/// One successful match, consumed by the controller to update the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub label: Emotion,
    pub score: f32,
    pub timestamp: DateTime<Utc>,
}

/// Pure threshold check; holds only the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEvaluator {
    threshold: f32,
}

impl Default for MatchEvaluator {
    fn default() -> Self {
        Self::new(MATCH_THRESHOLD)
    }
}

impl MatchEvaluator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn evaluate(&self, scores: &EmotionScores, target: Emotion, cooldown_active: bool) -> bool {
        !cooldown_active && scores.score(target) > self.threshold
    }

    /// Every target must clear the threshold in the same frame.
    pub fn evaluate_all(
        &self,
        scores: &EmotionScores,
        targets: &[Emotion],
        cooldown_active: bool,
    ) -> bool {
        !targets.is_empty()
            && targets
                .iter()
                .all(|target| self.evaluate(scores, *target, cooldown_active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn happy(score: f32) -> EmotionScores {
        EmotionScores::from_pairs([(Emotion::Happy, score)])
    }

    #[test]
    fn threshold_is_strict() {
        let evaluator = MatchEvaluator::default();
        assert!(!evaluator.evaluate(&happy(0.6), Emotion::Happy, false));
        assert!(evaluator.evaluate(&happy(0.61), Emotion::Happy, false));
    }

    #[test]
    fn cooldown_suppresses_match() {
        let evaluator = MatchEvaluator::default();
        assert!(!evaluator.evaluate(&happy(1.0), Emotion::Happy, true));
    }

    #[test]
    fn absent_target_never_matches() {
        let evaluator = MatchEvaluator::default();
        assert!(!evaluator.evaluate(&happy(1.0), Emotion::Sad, false));
        assert!(!evaluator.evaluate(&EmotionScores::new(), Emotion::Sad, false));
    }

    #[test]
    fn evaluate_all_needs_every_target() {
        let evaluator = MatchEvaluator::default();
        let scores = EmotionScores::from_pairs([(Emotion::Happy, 0.9), (Emotion::Surprised, 0.5)]);
        assert!(!evaluator.evaluate_all(&scores, &[Emotion::Happy, Emotion::Surprised], false));

        let scores = EmotionScores::from_pairs([(Emotion::Happy, 0.9), (Emotion::Surprised, 0.65)]);
        assert!(evaluator.evaluate_all(&scores, &[Emotion::Happy, Emotion::Surprised], false));
        assert!(!evaluator.evaluate_all(&scores, &[Emotion::Happy, Emotion::Surprised], true));
        assert!(!evaluator.evaluate_all(&scores, &[], false));
    }

    #[test]
    fn custom_threshold() {
        let evaluator = MatchEvaluator::new(0.5);
        assert!(evaluator.evaluate(&happy(0.55), Emotion::Happy, false));
    }
}
