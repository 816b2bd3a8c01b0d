use thiserror::Error;

/// Failures reported by the capture side: device acquisition and recording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("no capture device available: {0}")]
    Unavailable(String),
    #[error("recorder failed to start: {0}")]
    RecorderStart(String),
    #[error("recorder failed to finalize: {0}")]
    RecorderStop(String),
    #[error("recording handle {0} is not active")]
    UnknownHandle(u64),
}

/// Per-tick classifier failure. Never fatal to a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier models not loaded")]
    NotLoaded,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("frame rejected: {0}")]
    BadFrame(String),
}

/// Errors surfaced to the caller of a challenge controller.
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// The capture device could not be acquired. The session stays `Idle`
    /// and may be started again.
    #[error("could not acquire capture device: {0}")]
    Acquisition(#[source] CaptureError),
    /// Settings rejected by validation. Nothing is acquired and the
    /// controller stays `Idle`.
    #[error("invalid challenge settings: {0}")]
    InvalidSettings(String),
    #[error("challenge already started")]
    AlreadyStarted,
    #[error("challenge has not been started")]
    NotStarted,
    #[error("challenge result was already taken")]
    ResultTaken,
    #[error("artifact encoding failed: {0}")]
    Artifact(String),
    #[error("session task failed: {0}")]
    Runtime(String),
}

impl ChallengeError {
    /// Message suitable for showing to the person taking the challenge.
    pub fn user_message(&self) -> String {
        match self {
            ChallengeError::Acquisition(CaptureError::PermissionDenied(_)) => {
                "Failed to access camera. Please check permissions.".to_string()
            }
            ChallengeError::Acquisition(_) => {
                "No camera found. Connect a camera and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
