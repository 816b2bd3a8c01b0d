pub mod frame;
pub mod scripted;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{emotion::EmotionScores, error::ClassifierError};

pub use frame::Frame;
pub use scripted::{MirrorClassifier, ScriptStep, ScriptedClassifier};

/// Face bounding box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// What the classifier reports for a frame that contains a face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    pub expressions: EmotionScores,
    /// Face detector confidence in `[0, 1]`.
    pub detection_score: f32,
    pub face_box: FaceBox,
    /// `None` when the classifier does not report landmarks.
    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceDetection {
    /// Detection covering the whole frame with full detector confidence.
    pub fn full_frame(expressions: EmotionScores, width: u32, height: u32) -> Self {
        Self {
            expressions,
            detection_score: 1.0,
            face_box: FaceBox {
                x: 0.0,
                y: 0.0,
                width: width as f32,
                height: height as f32,
            },
            landmarks: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
}

/// Landmark points of the features a live face has to show, in frame pixels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarks {
    pub left_eye: Vec<(f32, f32)>,
    pub right_eye: Vec<(f32, f32)>,
    pub nose: Vec<(f32, f32)>,
    pub mouth: Vec<(f32, f32)>,
}

impl FaceLandmarks {
    /// Features without any landmark point.
    pub fn missing_features(&self) -> Vec<&'static str> {
        [
            ("left eye", &self.left_eye),
            ("right eye", &self.right_eye),
            ("nose", &self.nose),
            ("mouth", &self.mouth),
        ]
        .into_iter()
        .filter(|(_, points)| points.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Face/expression model boundary.
///
/// `Ok(None)` means no face was found in the frame, which is distinct from a
/// face whose expressions all score zero.
pub trait Classifier: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Option<FaceDetection>, ClassifierError>;
}

/// Shared handle to the loaded classifier, owned by the application root and
/// handed to each controller.
#[derive(Clone)]
pub struct ClassifierHandle {
    name: Arc<str>,
    inner: Arc<dyn Classifier>,
}

impl ClassifierHandle {
    pub fn new<C>(name: &str, classifier: C) -> Self
    where
        C: Classifier + 'static,
    {
        Self {
            name: Arc::from(name),
            inner: Arc::new(classifier),
        }
    }

    pub fn from_arc(name: &str, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            name: Arc::from(name),
            inner: classifier,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detect(&self, frame: &Frame) -> Result<Option<FaceDetection>, ClassifierError> {
        self.inner.detect(frame)
    }
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("name", &self.name)
            .finish()
    }
}
