//! Image sequence input
//!
//! Plays a directory of still images as if they were camera frames. Useful
//! for replaying recorded sessions and for running without a webcam.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{AcquireError, CameraFrame, FrameSource};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

/// Frame source backed by image files in a directory, in file name order
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next_index: usize,
    looping: bool,
    frame_interval: Option<Duration>,
    next_frame_at: Option<Instant>,
    frame_count: u64,
}

impl ImageSequenceSource {
    /// Scan `dir` for images.
    ///
    /// With `looping` the sequence restarts after the last image instead of
    /// ending the stream.
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self, AcquireError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| AcquireError::Device(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && Self::is_image(path))
            .collect();
        files.sort();

        log::info!("Image sequence {}: {} frames", dir.display(), files.len());

        Ok(Self {
            dir,
            files,
            next_index: 0,
            looping,
            frame_interval: None,
            next_frame_at: None,
            frame_count: 0,
        })
    }

    /// Pace delivery to at most `fps` frames per second (0 disables pacing)
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_nanos(1_000_000_000 / fps as u64));
        self
    }

    /// Number of images found
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the directory held no images
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn wait_for_slot(&mut self) {
        let Some(interval) = self.frame_interval else { return };
        let now = Instant::now();
        if let Some(at) = self.next_frame_at {
            if at > now {
                std::thread::sleep(at - now);
            }
        }
        self.next_frame_at = Some(Instant::now() + interval);
    }
}

impl FrameSource for ImageSequenceSource {
    fn acquire_frame(&mut self) -> Result<CameraFrame, AcquireError> {
        if self.next_index >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Err(AcquireError::EndOfStream);
            }
            self.next_index = 0;
        }

        let path = &self.files[self.next_index];
        self.next_index += 1;

        let image = image::open(path)
            .map_err(|e| AcquireError::Decode(format!("{}: {}", path.display(), e)))?
            .to_rgba8();

        self.wait_for_slot();

        let frame = CameraFrame::from_image(image, self.frame_count);
        self.frame_count += 1;
        Ok(frame)
    }

    fn name(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }
}
