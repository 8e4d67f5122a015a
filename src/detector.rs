//! Detector loop
//!
//! Runs on its own thread, pulling frames as fast as the source delivers
//! them. Each cycle replaces the shared visibility flag with whether the
//! target marker was in that frame, then forwards an annotated frame to the
//! preview. The loop ends on the first acquisition failure or when the
//! preview asks to quit; the flag keeps its last value afterwards.

use std::io;
use std::thread::{self, JoinHandle};

use crate::annotate::annotate_markers;
use crate::camera::{AcquireError, FrameSource};
use crate::marker::{contains_marker, MarkerDetector, MarkerId};
use crate::preview::PreviewSurface;
use crate::visibility::VisibilityFlag;

/// Why the detector loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorExit {
    /// A frame could not be acquired
    EndOfStream,
    /// The preview asked to quit
    QuitRequested,
    /// The frame source could not be opened at all
    SourceUnavailable,
}

/// Marker detection loop, writer of the visibility flag
pub struct DetectorLoop<D, P> {
    detector: D,
    preview: P,
    target: MarkerId,
    flag: VisibilityFlag,
    cycles: u64,
}

impl<D: MarkerDetector, P: PreviewSurface> DetectorLoop<D, P> {
    pub fn new(detector: D, preview: P, target: MarkerId, flag: VisibilityFlag) -> Self {
        Self {
            detector,
            preview,
            target,
            flag,
            cycles: 0,
        }
    }

    /// Completed detection cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one detection cycle and return whether the target was seen.
    ///
    /// An acquisition error leaves the flag untouched. A detection error
    /// counts as an empty result.
    pub fn cycle<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<bool, AcquireError> {
        let frame = source.acquire_frame()?;

        let markers = match self.detector.detect(&frame) {
            Ok(markers) => markers,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {}", frame.frame_number, e);
                Vec::new()
            }
        };

        let found = contains_marker(&markers, self.target);
        let previous = self.flag.publish(found);
        if previous != found {
            if found {
                log::info!("Marker {} detected", self.target);
            } else {
                log::info!("Marker {} lost", self.target);
            }
        }

        self.preview.show(annotate_markers(&frame, &markers));
        self.cycles += 1;
        Ok(found)
    }

    /// Run cycles until the source fails or quit is requested.
    ///
    /// The source is released and the preview closed before returning.
    pub fn run<S: FrameSource>(mut self, mut source: S) -> DetectorExit {
        log::info!(
            "Detector started on {} (target marker {})",
            source.name(),
            self.target
        );

        let exit = loop {
            if let Err(e) = self.cycle(&mut source) {
                match e {
                    AcquireError::EndOfStream => log::info!("Frame source exhausted"),
                    other => log::warn!("Frame acquisition failed: {}", other),
                }
                break DetectorExit::EndOfStream;
            }
            if self.preview.quit_requested() {
                log::info!("Quit requested from preview");
                break DetectorExit::QuitRequested;
            }
        };

        drop(source);
        self.preview.close();
        log::info!("Detector stopped after {} cycles ({:?})", self.cycles, exit);
        exit
    }

    /// Open the source with `open_source`, then [`run`](Self::run).
    pub fn open_and_run<S, F>(mut self, open_source: F) -> DetectorExit
    where
        S: FrameSource,
        F: FnOnce() -> Result<S, AcquireError>,
    {
        match open_source() {
            Ok(source) => self.run(source),
            Err(e) => {
                log::error!("Failed to open frame source: {}", e);
                self.preview.close();
                DetectorExit::SourceUnavailable
            }
        }
    }

    /// Run the loop on a background thread named `marker-detector`.
    ///
    /// The source is opened on that thread, so it does not need to be `Send`.
    pub fn spawn<S, F>(self, open_source: F) -> io::Result<DetectorHandle>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S, AcquireError> + Send + 'static,
        D: Send + 'static,
        P: Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("marker-detector".to_string())
            .spawn(move || self.open_and_run(open_source))?;
        Ok(DetectorHandle { handle })
    }
}

/// Owner of the detector thread.
///
/// The window thread keeps this for the life of the process without joining
/// it: rendering must not wait on camera I/O, and the detector finishes on
/// its own terms. Dropping the handle detaches the thread.
pub struct DetectorHandle {
    handle: JoinHandle<DetectorExit>,
}

impl DetectorHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the loop exits
    pub fn join(self) -> thread::Result<DetectorExit> {
        self.handle.join()
    }
}
