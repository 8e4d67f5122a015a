//! Camera frame acquisition
//!
//! Frames are pulled synchronously by the detector thread through the
//! [`FrameSource`] trait. Any acquisition error ends the detector loop, so
//! sources do not retry internally.

mod sequence;

#[cfg(feature = "camera")]
mod device;

use std::time::Instant;

use image::{GrayImage, RgbaImage};

pub use sequence::ImageSequenceSource;

#[cfg(feature = "camera")]
pub use device::{CameraInfo, CameraSource};

/// Camera frame data
#[derive(Clone)]
pub struct CameraFrame {
    /// RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame number
    pub frame_number: u64,
    /// Frame timestamp
    pub timestamp: Instant,
}

impl CameraFrame {
    /// Wrap a decoded RGBA image
    pub fn from_image(image: RgbaImage, frame_number: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            frame_number,
            timestamp: Instant::now(),
        }
    }

    /// Whether the pixel buffer matches the advertised dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width as usize) * (self.height as usize) * 4
    }

    /// Copy the pixels into an RGBA image, `None` if the buffer is malformed
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        if !self.is_well_formed() {
            return None;
        }
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Convert to 8-bit luma (Rec. 601 weights), `None` if the buffer is malformed
    pub fn to_luma(&self) -> Option<GrayImage> {
        if !self.is_well_formed() {
            return None;
        }

        let luma: Vec<u8> = self
            .data
            .chunks_exact(4)
            .map(|px| {
                let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                y.round().min(255.0) as u8
            })
            .collect();

        GrayImage::from_raw(self.width, self.height, luma)
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frame_number", &self.frame_number)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Reasons a frame could not be acquired. All of them end the stream.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("end of stream")]
    EndOfStream,
    #[error("camera device error: {0}")]
    Device(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

/// A blocking producer of camera frames
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// An `Err` means the stream is over; callers must not call again.
    fn acquire_frame(&mut self) -> Result<CameraFrame, AcquireError>;

    /// Human readable source name for logging
    fn name(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn acquire_frame(&mut self) -> Result<CameraFrame, AcquireError> {
        (**self).acquire_frame()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
