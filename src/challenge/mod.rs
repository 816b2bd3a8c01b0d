pub mod catalog;
pub mod controller;
mod session;
pub mod state;
pub mod strategy;
pub mod timers;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{capture::MediaBlob, emotion::Emotion, verification::FaceVerification};

pub use catalog::{catalog, issue_token, ChallengeInfo, ChallengeKind};
pub use controller::ChallengeController;
pub use state::{ChallengeSession, ChallengeSnapshot, ChallengeStatus, EndReason, Prompt};
pub use strategy::{strategy_for, Artifact, CaptureStrategy, FrameContext};
pub use timers::{TimerKind, TimerToken, Timers};

/// Final outcome of a session, produced exactly once when it ends and handed
/// to the caller for submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResult {
    pub session_id: String,
    pub kind: ChallengeKind,
    pub recorded_media: MediaBlob,
    pub matched_count: u32,
    pub matched_history: Vec<Emotion>,
    pub passed: bool,
    pub end_reason: EndReason,
    pub best_score: f32,
    pub face_check: Option<FaceVerification>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}
