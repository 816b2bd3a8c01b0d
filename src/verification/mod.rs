//! Human-presence report for a captured selfie.
//!
//! The report combines detector confidence, how much of the frame the face
//! covers and how expressive the face is into a 0-100 confidence, and checks
//! the requested expressions ("vibe check") against a lenient threshold.

use serde::{Deserialize, Serialize};

use crate::{
    classifier::FaceDetection,
    emotion::{Emotion, EmotionScores},
};

/// Detections below this detector score are rejected outright.
pub const MIN_DETECTION_SCORE: f32 = 0.7;
/// Minimum face area as a fraction of the frame.
pub const MIN_FACE_RATIO: f32 = 0.03;
/// Confidence above which the frame counts as showing a live human.
pub const HUMAN_CONFIDENCE_THRESHOLD: u32 = 70;
/// A requested expression passes the vibe check above this score.
pub const VIBE_PASS_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeCheck {
    pub requested: Vec<Emotion>,
    pub detected: EmotionScores,
    pub dominant: Option<Emotion>,
    /// 0-100.
    pub match_score: u32,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerification {
    pub is_human: bool,
    /// 0-100.
    pub confidence: u32,
    pub message: Option<String>,
    pub vibe_check: Option<VibeCheck>,
}

impl FaceVerification {
    fn rejected(confidence: u32, message: &str) -> Self {
        Self {
            is_human: false,
            confidence,
            message: Some(message.to_string()),
            vibe_check: None,
        }
    }
}

pub fn verify_face(
    detection: Option<&FaceDetection>,
    frame_width: u32,
    frame_height: u32,
    requested: &[Emotion],
) -> FaceVerification {
    let Some(detection) = detection else {
        return FaceVerification::rejected(0, "No face detected in image");
    };

    if detection.detection_score < MIN_DETECTION_SCORE {
        return FaceVerification::rejected(
            (detection.detection_score * 100.0).round() as u32,
            "Low confidence face detection",
        );
    }

    if let Some(landmarks) = &detection.landmarks {
        let missing = landmarks.missing_features();
        if !missing.is_empty() {
            return FaceVerification::rejected(
                30,
                &format!("Missing facial features: {}", missing.join(", ")),
            );
        }
    }

    let frame_area = frame_width as f32 * frame_height as f32;
    let face_ratio = if frame_area > 0.0 {
        detection.face_box.area() / frame_area
    } else {
        0.0
    };

    if face_ratio < MIN_FACE_RATIO {
        return FaceVerification::rejected(40, "Face too small in frame");
    }

    let confidence = confidence_score(detection.detection_score, &detection.expressions, face_ratio);

    FaceVerification {
        is_human: confidence > HUMAN_CONFIDENCE_THRESHOLD,
        confidence,
        message: None,
        vibe_check: Some(vibe_check(&detection.expressions, requested)),
    }
}

/// Detector score contributes up to 50, face size up to 30 and expression
/// variance up to 20.
fn confidence_score(detection_score: f32, expressions: &EmotionScores, face_ratio: f32) -> u32 {
    let mut score = detection_score * 50.0;
    score += (face_ratio * 100.0).min(30.0);
    score += (variance(expressions.values()) * 1000.0).min(20.0);
    score.round().clamp(0.0, 100.0) as u32
}

fn variance(values: impl Iterator<Item = f32>) -> f32 {
    let values: Vec<f32> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|value| (value - mean).powi(2)).sum::<f32>() / values.len() as f32
}

fn vibe_check(expressions: &EmotionScores, requested: &[Emotion]) -> VibeCheck {
    let dominant = expressions.dominant();

    if requested.is_empty() {
        let (label, score) = dominant.unwrap_or((Emotion::Neutral, 0.0));
        return VibeCheck {
            requested: Vec::new(),
            detected: expressions.clone(),
            dominant: dominant.map(|(label, _)| label),
            match_score: (score * 100.0).round() as u32,
            passed: true,
            message: format!("Your vibe is {} {}", label.display_name(), label.emoji()),
        };
    }

    let mean = requested
        .iter()
        .map(|label| expressions.score(*label))
        .sum::<f32>()
        / requested.len() as f32;
    let passed = requested
        .iter()
        .all(|label| expressions.score(*label) > VIBE_PASS_THRESHOLD);

    let names = requested
        .iter()
        .map(|label| label.display_name())
        .collect::<Vec<_>>()
        .join(" and ");
    let emojis: String = requested.iter().map(|label| label.emoji()).collect();

    let message = if passed {
        format!("Great {names} vibe! {emojis}")
    } else {
        format!("Try to look more {}! {emojis}", names.to_lowercase())
    };

    VibeCheck {
        requested: requested.to_vec(),
        detected: expressions.clone(),
        dominant: dominant.map(|(label, _)| label),
        match_score: (mean * 100.0).round() as u32,
        passed,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FaceBox, FaceLandmarks};

    fn landmarks() -> FaceLandmarks {
        FaceLandmarks {
            left_eye: vec![(200.0, 180.0), (230.0, 178.0)],
            right_eye: vec![(400.0, 180.0), (430.0, 178.0)],
            nose: vec![(320.0, 260.0)],
            mouth: vec![(280.0, 340.0), (360.0, 340.0)],
        }
    }

    fn detection(score: f32, face: (f32, f32), expressions: EmotionScores) -> FaceDetection {
        FaceDetection {
            expressions,
            detection_score: score,
            face_box: FaceBox {
                x: 0.0,
                y: 0.0,
                width: face.0,
                height: face.1,
            },
            landmarks: None,
        }
    }

    #[test]
    fn no_face_is_not_human() {
        let report = verify_face(None, 640, 480, &[]);
        assert!(!report.is_human);
        assert_eq!(report.confidence, 0);
        assert_eq!(report.message.as_deref(), Some("No face detected in image"));
    }

    #[test]
    fn weak_detection_reports_detector_confidence() {
        let report = verify_face(
            Some(&detection(0.5, (300.0, 300.0), EmotionScores::uniform(0.1))),
            640,
            480,
            &[],
        );
        assert!(!report.is_human);
        assert_eq!(report.confidence, 50);
    }

    #[test]
    fn tiny_face_is_rejected() {
        let report = verify_face(
            Some(&detection(0.95, (20.0, 20.0), EmotionScores::uniform(0.1))),
            640,
            480,
            &[],
        );
        assert_eq!(report.confidence, 40);
        assert_eq!(report.message.as_deref(), Some("Face too small in frame"));
    }

    #[test]
    fn expressive_full_face_scores_high() {
        let expressions = EmotionScores::from_pairs([(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)]);
        let report = verify_face(
            Some(&detection(0.9, (640.0, 480.0), expressions)),
            640,
            480,
            &[Emotion::Happy],
        );
        // 45 from the detector, 30 for size, 20 for variance
        assert_eq!(report.confidence, 95);
        assert!(report.is_human);

        let vibe = report.vibe_check.unwrap();
        assert!(vibe.passed);
        assert_eq!(vibe.match_score, 90);
        assert_eq!(vibe.dominant, Some(Emotion::Happy));
        assert!(vibe.message.starts_with("Great Happy vibe!"));
    }

    #[test]
    fn flat_face_without_variance_stays_below_human_threshold() {
        let report = verify_face(
            Some(&detection(0.8, (200.0, 160.0), EmotionScores::uniform(0.2))),
            640,
            480,
            &[],
        );
        // 40 from the detector, 10 for size
        assert_eq!(report.confidence, 50);
        assert!(!report.is_human);
    }

    #[test]
    fn dual_request_needs_both_labels() {
        let expressions = EmotionScores::from_pairs([(Emotion::Happy, 0.6), (Emotion::Surprised, 0.2)]);
        let report = verify_face(
            Some(&detection(1.0, (640.0, 480.0), expressions)),
            640,
            480,
            &[Emotion::Happy, Emotion::Surprised],
        );
        let vibe = report.vibe_check.unwrap();
        assert!(!vibe.passed);
        assert_eq!(vibe.match_score, 40);
        assert!(vibe.message.contains("happy and surprised"));
    }

    #[test]
    fn hidden_features_are_rejected() {
        let mut partial = landmarks();
        partial.right_eye.clear();
        partial.mouth.clear();

        let face = detection(0.95, (640.0, 480.0), EmotionScores::uniform(0.1)).with_landmarks(partial);
        let report = verify_face(Some(&face), 640, 480, &[]);
        assert!(!report.is_human);
        assert_eq!(report.confidence, 30);
        assert_eq!(
            report.message.as_deref(),
            Some("Missing facial features: right eye, mouth")
        );
        assert!(report.vibe_check.is_none());
    }

    #[test]
    fn complete_landmarks_pass_through_to_scoring() {
        let expressions = EmotionScores::from_pairs([(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)]);
        let face = detection(0.9, (640.0, 480.0), expressions).with_landmarks(landmarks());
        let report = verify_face(Some(&face), 640, 480, &[Emotion::Happy]);
        assert_eq!(report.confidence, 95);
        assert!(report.is_human);
    }

    #[test]
    fn landmark_check_runs_after_detector_score() {
        let face = detection(0.5, (640.0, 480.0), EmotionScores::uniform(0.1))
            .with_landmarks(FaceLandmarks::default());
        let report = verify_face(Some(&face), 640, 480, &[]);
        assert_eq!(report.confidence, 50);
        assert_eq!(report.message.as_deref(), Some("Low confidence face detection"));
    }
}
