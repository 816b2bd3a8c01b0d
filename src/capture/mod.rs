pub mod recorder;
pub mod synthetic;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{classifier::Frame, error::CaptureError};

pub use recorder::{ChunkFeed, ChunkRecorder};
pub use synthetic::{SyntheticCamera, SyntheticSource};

pub const WEBM_MIME: &str = "video/webm";
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Camera hardware. Acquisition failure is fatal to a session start.
pub trait CaptureDevice: Send + Sync {
    fn acquire(&self, facing: FacingMode) -> Result<Box<dyn MediaSource>, CaptureError>;
}

/// A live camera stream. Owned by one session for its lifetime.
pub trait MediaSource: Send {
    fn id(&self) -> &str;

    /// Latest frame, or `None` when the stream has nothing ready.
    fn grab_frame(&mut self) -> Option<Frame>;

    /// Frees the underlying hardware. Calling it twice is harmless.
    fn release(&mut self);
}

/// Opaque id of one recording started on a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordingHandle(pub u64);

impl fmt::Display for RecordingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// Accumulates encoded media while a recording runs.
pub trait CaptureSink: Send {
    fn start(&mut self, source: &dyn MediaSource) -> Result<RecordingHandle, CaptureError>;

    /// Finalizes the recording into a playable blob.
    fn stop(&mut self, handle: RecordingHandle) -> Result<MediaBlob, CaptureError>;
}

/// Finished media. Never mutated after construction. Serializes as a
/// summary without the payload.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    mime_type: String,
    #[serde(skip)]
    bytes: Vec<u8>,
    size_bytes: usize,
}

impl MediaBlob {
    pub fn new(mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            size_bytes: bytes.len(),
            bytes,
        }
    }

    pub fn empty(mime_type: &str) -> Self {
        Self::new(mime_type, Vec::new())
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
