//! Live preview of annotated camera frames
//!
//! The detector thread owns a [`PreviewSurface`]. The concrete window lives on
//! the main thread, so [`PreviewChannel`] forwards frames over a one-slot
//! channel and carries the quit request back as a shared flag. A frame the
//! window has not taken yet is replaced by the next one, so the window always
//! gets the newest annotated frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::camera::CameraFrame;

/// Where the detector loop sends annotated frames
pub trait PreviewSurface {
    /// Display one annotated frame
    fn show(&mut self, frame: CameraFrame);

    /// Whether the user asked the detector to stop (the `q` key)
    fn quit_requested(&self) -> bool;

    /// Tear the preview down. Called once when the detector loop exits.
    fn close(&mut self);
}

impl<P: PreviewSurface + ?Sized> PreviewSurface for Box<P> {
    fn show(&mut self, frame: CameraFrame) {
        (**self).show(frame)
    }

    fn quit_requested(&self) -> bool {
        (**self).quit_requested()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Detector-side end of the preview hand-off
pub struct PreviewChannel {
    /// Sending end, plus a receiver used to evict a stale pending frame
    ends: Option<(Sender<CameraFrame>, Receiver<CameraFrame>)>,
    quit: Arc<AtomicBool>,
    replaced: u64,
}

/// Main-thread end of the preview hand-off
pub struct PreviewReceiver {
    receiver: Receiver<CameraFrame>,
    quit: Arc<AtomicBool>,
    closed: bool,
}

impl PreviewChannel {
    /// Create a connected pair. The channel holds one frame.
    pub fn new() -> (PreviewChannel, PreviewReceiver) {
        let (sender, receiver) = crossbeam_channel::bounded::<CameraFrame>(1);
        let quit = Arc::new(AtomicBool::new(false));

        (
            PreviewChannel {
                ends: Some((sender, receiver.clone())),
                quit: quit.clone(),
                replaced: 0,
            },
            PreviewReceiver {
                receiver,
                quit,
                closed: false,
            },
        )
    }

    /// Pending frames evicted before the window took them
    pub fn replaced_frames(&self) -> u64 {
        self.replaced
    }
}

impl PreviewSurface for PreviewChannel {
    fn show(&mut self, frame: CameraFrame) {
        let Some((sender, stale)) = self.ends.as_ref() else {
            return;
        };
        // `stale` keeps the channel connected, so the only failure is a full
        // slot. This is the only sender, so the slot is free after eviction.
        if let Err(TrySendError::Full(frame)) = sender.try_send(frame) {
            if stale.try_recv().is_ok() {
                self.replaced += 1;
            }
            let _ = sender.try_send(frame);
        }
    }

    fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    fn close(&mut self) {
        // Dropping the sender disconnects the receiver
        if self.ends.take().is_some() {
            log::info!("Preview closed ({} frames replaced)", self.replaced);
        }
    }
}

impl PreviewReceiver {
    /// Most recent pending frame, if any.
    ///
    /// Notices a closed channel once the last frame has been taken.
    pub fn latest(&mut self) -> Option<CameraFrame> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        latest
    }

    /// Ask the detector loop to stop at the end of its current cycle
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    /// Whether the detector side has closed the preview
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Preview that discards frames and never asks to quit
#[derive(Debug, Default)]
pub struct HeadlessPreview {
    shown: u64,
}

impl HeadlessPreview {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewSurface for HeadlessPreview {
    fn show(&mut self, _frame: CameraFrame) {
        self.shown += 1;
    }

    fn quit_requested(&self) -> bool {
        false
    }

    fn close(&mut self) {
        log::debug!("Headless preview closed after {} frames", self.shown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn frame(number: u64) -> CameraFrame {
        CameraFrame::from_image(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])), number)
    }

    #[test]
    fn test_newest_frame_replaces_pending() {
        let (mut channel, mut receiver) = PreviewChannel::new();
        channel.show(frame(0));
        channel.show(frame(1));
        channel.show(frame(2));
        assert_eq!(channel.replaced_frames(), 2);

        let latest = receiver.latest().unwrap();
        assert_eq!(latest.frame_number, 2);
        assert!(receiver.latest().is_none());
        assert!(!receiver.is_closed());

        channel.show(frame(3));
        assert_eq!(receiver.latest().unwrap().frame_number, 3);
        assert_eq!(channel.replaced_frames(), 2);
    }

    #[test]
    fn test_replacement_across_threads() {
        let (mut channel, mut receiver) = PreviewChannel::new();
        let producer = std::thread::spawn(move || {
            for n in 0..500 {
                channel.show(frame(n));
            }
            channel.close();
        });

        let mut last = None;
        while !receiver.is_closed() {
            if let Some(frame) = receiver.latest() {
                // Frames arrive in order, never repeated
                if let Some(previous) = last {
                    assert!(frame.frame_number > previous);
                }
                last = Some(frame.frame_number);
            }
        }
        producer.join().unwrap();
        assert_eq!(last, Some(499));
    }

    #[test]
    fn test_quit_flag_is_shared() {
        let (channel, receiver) = PreviewChannel::new();
        assert!(!channel.quit_requested());
        receiver.request_quit();
        assert!(channel.quit_requested());
        assert!(receiver.quit_requested());
    }

    #[test]
    fn test_close_disconnects() {
        let (mut channel, mut receiver) = PreviewChannel::new();
        channel.show(frame(5));
        channel.close();

        // Pending frame still delivered, then the close is seen
        assert_eq!(receiver.latest().unwrap().frame_number, 5);
        assert!(receiver.is_closed());

        // Further frames go nowhere
        channel.show(frame(6));
        assert!(receiver.latest().is_none());
    }

    #[test]
    fn test_receiver_dropped() {
        let (mut channel, receiver) = PreviewChannel::new();
        drop(receiver);
        channel.show(frame(0));
        channel.show(frame(1));
        assert!(!channel.quit_requested());
    }

    #[test]
    fn test_headless() {
        let mut preview = HeadlessPreview::new();
        preview.show(frame(0));
        assert!(!preview.quit_requested());
        preview.close();
    }
}
