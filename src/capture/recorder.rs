use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::error::CaptureError;

use super::{CaptureSink, MediaBlob, MediaSource, RecordingHandle, WEBM_MIME};

#[derive(Debug, Default)]
struct ChunkBuffer {
    active: Option<RecordingHandle>,
    chunks: Vec<Vec<u8>>,
}

/// Producer side of a [`ChunkRecorder`]. Chunks delivered while no recording
/// is active are dropped.
#[derive(Debug, Clone)]
pub struct ChunkFeed {
    buffer: Arc<Mutex<ChunkBuffer>>,
}

impl ChunkFeed {
    /// Returns `true` if the chunk was kept.
    pub fn push(&self, chunk: &[u8]) -> bool {
        if chunk.is_empty() {
            return false;
        }

        let Ok(mut buffer) = self.buffer.lock() else {
            return false;
        };

        if buffer.active.is_none() {
            return false;
        }

        buffer.chunks.push(chunk.to_vec());
        true
    }
}

/// In-memory recorder: collects chunks between `start` and `stop` and
/// concatenates them into one webm blob.
#[derive(Debug, Default)]
pub struct ChunkRecorder {
    buffer: Arc<Mutex<ChunkBuffer>>,
    next_id: u64,
}

impl ChunkRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> ChunkFeed {
        ChunkFeed {
            buffer: Arc::clone(&self.buffer),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.buffer
            .lock()
            .map(|buffer| buffer.active.is_some())
            .unwrap_or(false)
    }
}

impl CaptureSink for ChunkRecorder {
    fn start(&mut self, source: &dyn MediaSource) -> Result<RecordingHandle, CaptureError> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| CaptureError::RecorderStart("chunk buffer poisoned".into()))?;

        if let Some(active) = buffer.active {
            return Err(CaptureError::RecorderStart(format!(
                "{active} is still recording"
            )));
        }

        self.next_id += 1;
        let handle = RecordingHandle(self.next_id);
        buffer.active = Some(handle);
        buffer.chunks.clear();

        info!("Recorder {} started on source {}", handle, source.id());
        Ok(handle)
    }

    fn stop(&mut self, handle: RecordingHandle) -> Result<MediaBlob, CaptureError> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| CaptureError::RecorderStop("chunk buffer poisoned".into()))?;

        if buffer.active != Some(handle) {
            return Err(CaptureError::UnknownHandle(handle.0));
        }

        buffer.active = None;
        let chunks = std::mem::take(&mut buffer.chunks);
        debug!("Recorder {} joining {} chunks", handle, chunks.len());

        let blob = MediaBlob::new(WEBM_MIME, chunks.concat());
        info!(
            "Recorder {} stopped, final recording size: {:.2}KB",
            handle,
            blob.len() as f64 / 1024.0
        );
        Ok(blob)
    }
}
