use std::io::Cursor;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbaImage};

/// A single camera frame in RGBA order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Offset from the moment the media source was acquired.
    pub offset: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, offset: Duration, frame_number: u64) -> Self {
        Self {
            width,
            height,
            data,
            offset,
            frame_number,
        }
    }

    /// Frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], offset: Duration, frame_number: u64) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, data, offset, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.pixel_count() * 4
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// PNG encoding of the frame, used for selfie artifacts.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let image = self.to_image().ok_or_else(|| {
            anyhow!(
                "frame {} has {} bytes, expected {}",
                self.frame_number,
                self.data.len(),
                self.pixel_count() * 4
            )
        })?;

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .with_context(|| format!("failed to encode frame {} as png", self.frame_number))?;
        Ok(bytes)
    }
}
