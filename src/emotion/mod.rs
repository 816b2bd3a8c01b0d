pub mod evaluator;
pub mod selector;

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use evaluator::{MatchEvaluator, MatchEvent, MATCH_THRESHOLD};
pub use selector::TargetSelector;

/// Expression labels reported by the classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    /// Labels that may be requested from a player. Neutral is never a target.
    pub const TARGETS: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Neutral",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Angry => "Angry",
            Emotion::Fearful => "Fearful",
            Emotion::Disgusted => "Disgusted",
            Emotion::Surprised => "Surprised",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Neutral => "😐",
            Emotion::Happy => "😀",
            Emotion::Sad => "😢",
            Emotion::Angry => "😡",
            Emotion::Fearful => "😨",
            Emotion::Disgusted => "🤢",
            Emotion::Surprised => "😲",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == lowered)
            .ok_or_else(|| format!("unknown emotion label: {s}"))
    }
}

/// Per-label confidence scores for one classified frame.
///
/// Scores are clamped to `[0, 1]`. A label the classifier did not report
/// scores `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(HashMap<Emotion, f32>);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f32)>,
    {
        let mut scores = Self::new();
        for (label, score) in pairs {
            scores.insert(label, score);
        }
        scores
    }

    /// Every label at the same score.
    pub fn uniform(score: f32) -> Self {
        Self::from_pairs(Emotion::ALL.into_iter().map(|label| (label, score)))
    }

    pub fn insert(&mut self, label: Emotion, score: f32) {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        self.0.insert(label, score);
    }

    pub fn score(&self, label: Emotion) -> f32 {
        self.0.get(&label).copied().unwrap_or(0.0)
    }

    /// Highest-scoring label. Ties resolve to the label listed first in
    /// [`Emotion::ALL`].
    pub fn dominant(&self) -> Option<(Emotion, f32)> {
        Emotion::ALL
            .into_iter()
            .filter_map(|label| self.0.get(&label).map(|score| (label, *score)))
            .fold(None, |best, (label, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((label, score)),
            })
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.values().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
