use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use log::info;

use crate::{classifier::Frame, error::CaptureError};

use super::{CaptureDevice, ChunkFeed, FacingMode, MediaSource};

/// Stand-in camera producing flat-colour frames. Used by the demo binary and
/// by tests that need a device without hardware.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    denial: Option<CaptureError>,
    feed: Option<ChunkFeed>,
    acquisitions: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            denial: None,
            feed: None,
            acquisitions: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every acquisition fails with `error`.
    pub fn denied(mut self, error: CaptureError) -> Self {
        self.denial = Some(error);
        self
    }

    /// Sources push one chunk per grabbed frame into `feed`, standing in for
    /// an encoder attached to the stream.
    pub fn with_feed(mut self, feed: ChunkFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for SyntheticCamera {
    fn acquire(&self, facing: FacingMode) -> Result<Box<dyn MediaSource>, CaptureError> {
        if let Some(error) = &self.denial {
            return Err(error.clone());
        }

        let index = self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let id = format!("synthetic-{facing:?}-{index}").to_lowercase();
        info!("Acquired {} ({}x{})", id, self.width, self.height);

        let mut source = SyntheticSource::new(&id, self.width, self.height);
        source.feed = self.feed.clone();
        source.releases = Some(Arc::clone(&self.releases));
        Ok(Box::new(source))
    }
}

#[derive(Debug)]
pub struct SyntheticSource {
    id: String,
    width: u32,
    height: u32,
    next_frame: u64,
    opened_at: Instant,
    released: bool,
    feed: Option<ChunkFeed>,
    releases: Option<Arc<AtomicUsize>>,
}

impl SyntheticSource {
    pub fn new(id: &str, width: u32, height: u32) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            next_frame: 0,
            opened_at: Instant::now(),
            released: false,
            feed: None,
            releases: None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl MediaSource for SyntheticSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn grab_frame(&mut self) -> Option<Frame> {
        if self.released {
            return None;
        }

        let number = self.next_frame;
        self.next_frame += 1;

        let shade = (number % 256) as u8;
        let frame = Frame::solid(
            self.width,
            self.height,
            [shade, 128, 255 - shade, 255],
            self.opened_at.elapsed(),
            number,
        );

        if let Some(feed) = &self.feed {
            feed.push(&number.to_le_bytes());
        }

        Some(frame)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(counter) = &self.releases {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        info!("Released {}", self.id);
    }
}
