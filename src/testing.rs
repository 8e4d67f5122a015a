//! Scripted collaborators for loop tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

use crate::camera::{AcquireError, CameraFrame, FrameSource};
use crate::marker::{DetectError, DetectedMarker, MarkerDetector, MarkerId, Point2};
use crate::overlay::OverlayPose;
use crate::preview::PreviewSurface;
use crate::render::DisplaySurface;

/// Small valid frame carrying `number`
pub fn blank_frame(number: u64) -> CameraFrame {
    CameraFrame::from_image(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])), number)
}

pub fn marker(id: MarkerId) -> DetectedMarker {
    DetectedMarker {
        id,
        corners: [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ],
    }
}

/// Yields `frames` blank frames, then fails. Records when it is dropped.
pub struct ScriptedSource {
    remaining: usize,
    next: u64,
    pub released: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(frames: usize) -> Self {
        Self {
            remaining: frames,
            next: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn acquire_frame(&mut self) -> Result<CameraFrame, AcquireError> {
        if self.remaining == 0 {
            return Err(AcquireError::EndOfStream);
        }
        self.remaining -= 1;
        let frame = blank_frame(self.next);
        self.next += 1;
        Ok(frame)
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

/// Returns one scripted result per call, then empty detections
pub struct ScriptedDetector {
    script: VecDeque<Result<Vec<DetectedMarker>, DetectError>>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Result<Vec<DetectedMarker>, DetectError>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// One cycle per entry, each seeing exactly the listed ids
    pub fn from_ids(cycles: &[&[MarkerId]]) -> Self {
        Self::new(
            cycles
                .iter()
                .map(|ids| Ok(ids.iter().map(|&id| marker(id)).collect()))
                .collect(),
        )
    }
}

impl MarkerDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &CameraFrame) -> Result<Vec<DetectedMarker>, DetectError> {
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Preview that records what it was given. Can request quit after a number
/// of shown frames.
#[derive(Clone, Default)]
pub struct RecordingPreview {
    pub shown: Arc<Mutex<Vec<u64>>>,
    pub closed: Arc<AtomicBool>,
    pub quit_after: Option<usize>,
}

impl PreviewSurface for RecordingPreview {
    fn show(&mut self, frame: CameraFrame) {
        self.shown.lock().unwrap().push(frame.frame_number);
    }

    fn quit_requested(&self) -> bool {
        match self.quit_after {
            Some(n) => self.shown.lock().unwrap().len() >= n,
            None => false,
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// One recorded display call
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayCall {
    Clear,
    Overlay(f32),
    Present,
}

/// Display surface that records calls, keeping the overlay rotation angle
#[derive(Default)]
pub struct RecordingDisplay {
    pub calls: Vec<DisplayCall>,
}

impl RecordingDisplay {
    /// Rotation angle of every overlay drawn, in order
    pub fn overlay_angles(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Overlay(angle) => Some(*angle),
                _ => None,
            })
            .collect()
    }

    pub fn presents(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == DisplayCall::Present)
            .count()
    }
}

impl DisplaySurface for RecordingDisplay {
    type Error = std::convert::Infallible;

    fn clear(&mut self) {
        self.calls.push(DisplayCall::Clear);
    }

    fn draw_overlay(&mut self, pose: &OverlayPose) {
        self.calls.push(DisplayCall::Overlay(pose.angle_degrees));
    }

    fn present(&mut self) -> Result<(), Self::Error> {
        self.calls.push(DisplayCall::Present);
        Ok(())
    }
}
