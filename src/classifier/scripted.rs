use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{emotion::EmotionScores, error::ClassifierError};

use super::{Classifier, FaceDetection, Frame};

/// One scripted classifier outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Face(EmotionScores),
    NoFace,
    Fail(String),
}

/// Replays a fixed sequence of outcomes, one per `detect` call. Once the
/// script runs out the last step repeats; an empty script reports no face.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    steps: Arc<Vec<ScriptStep>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Arc::new(steps),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `detect` calls so far. Shared between clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn detect(&self, frame: &Frame) -> Result<Option<FaceDetection>, ClassifierError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.get(index).or_else(|| self.steps.last());

        match step {
            Some(ScriptStep::Face(scores)) => Ok(Some(FaceDetection::full_frame(
                scores.clone(),
                frame.width,
                frame.height,
            ))),
            Some(ScriptStep::Fail(reason)) => Err(ClassifierError::Inference(reason.clone())),
            Some(ScriptStep::NoFace) | None => Ok(None),
        }
    }
}

/// Scores every label at the same value, whatever the frame shows.
#[derive(Debug, Clone)]
pub struct MirrorClassifier {
    score: f32,
    calls: Arc<AtomicUsize>,
}

impl MirrorClassifier {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MirrorClassifier {
    fn detect(&self, frame: &Frame) -> Result<Option<FaceDetection>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(FaceDetection::full_frame(
            EmotionScores::uniform(self.score),
            frame.width,
            frame.height,
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::emotion::Emotion;

    fn frame() -> Frame {
        Frame::solid(2, 2, [0, 0, 0, 255], Duration::ZERO, 0)
    }

    #[test]
    fn replays_then_repeats_last_step() {
        let classifier = ScriptedClassifier::new(vec![
            ScriptStep::NoFace,
            ScriptStep::Fail("boom".into()),
            ScriptStep::Face(EmotionScores::from_pairs([(Emotion::Sad, 0.8)])),
        ]);

        assert_eq!(classifier.detect(&frame()), Ok(None));
        assert_eq!(
            classifier.detect(&frame()),
            Err(ClassifierError::Inference("boom".into()))
        );
        for _ in 0..3 {
            let detection = classifier.detect(&frame()).unwrap().unwrap();
            assert_eq!(detection.expressions.score(Emotion::Sad), 0.8);
        }
        assert_eq!(classifier.calls(), 5);
    }

    #[test]
    fn empty_script_reports_no_face() {
        let classifier = ScriptedClassifier::new(Vec::new());
        assert_eq!(classifier.detect(&frame()), Ok(None));
    }

    #[test]
    fn mirror_scores_every_label() {
        let classifier = MirrorClassifier::new(0.9);
        let detection = classifier.detect(&frame()).unwrap().unwrap();
        for label in Emotion::ALL {
            assert_eq!(detection.expressions.score(label), 0.9);
        }
        assert_eq!(classifier.calls(), 1);
    }
}
