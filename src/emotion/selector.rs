use rand::{seq::SliceRandom, Rng};

use super::Emotion;

/// Draws the next requested emotion.
///
/// Holds nothing but the label set; randomness is supplied per call so the
/// controller can seed it.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    labels: Vec<Emotion>,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self {
            labels: Emotion::TARGETS.to_vec(),
        }
    }
}

impl TargetSelector {
    /// Neutral and duplicate labels are dropped. An empty result falls back to
    /// the default target set.
    pub fn new<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = Emotion>,
    {
        let mut filtered: Vec<Emotion> = Vec::new();
        for label in labels {
            if label != Emotion::Neutral && !filtered.contains(&label) {
                filtered.push(label);
            }
        }

        if filtered.is_empty() {
            return Self::default();
        }

        Self { labels: filtered }
    }

    pub fn labels(&self) -> &[Emotion] {
        &self.labels
    }

    /// Uniform pick from the label set minus `excluding`.
    ///
    /// A single-label set has nothing else to offer, so it returns that label.
    pub fn next_target<R: Rng + ?Sized>(&self, excluding: Option<Emotion>, rng: &mut R) -> Emotion {
        let candidates: Vec<Emotion> = self
            .labels
            .iter()
            .copied()
            .filter(|label| Some(*label) != excluding)
            .collect();

        candidates
            .choose(rng)
            .or_else(|| self.labels.first())
            .copied()
            .unwrap_or(Emotion::Happy)
    }

    /// Two distinct targets; the first differs from `excluding`.
    pub fn next_pair<R: Rng + ?Sized>(
        &self,
        excluding: Option<Emotion>,
        rng: &mut R,
    ) -> (Emotion, Emotion) {
        let first = self.next_target(excluding, rng);
        let second = self.next_target(Some(first), rng);
        (first, second)
    }
}
