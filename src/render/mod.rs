//! Render loop
//!
//! Driven by a [`RepeatingTimer`] on the window thread. Each tick reads the
//! visibility flag once and either draws the overlay at the current
//! animation phase or leaves the cleared frame empty.

mod timer;

pub use timer::RepeatingTimer;

use crate::overlay::OverlayPose;
use crate::visibility::VisibilityFlag;

/// Target for one rendered frame
pub trait DisplaySurface {
    type Error: std::fmt::Debug;

    /// Start a new frame with an empty background
    fn clear(&mut self);

    /// Draw the overlay into the current frame
    fn draw_overlay(&mut self, pose: &OverlayPose);

    /// Show the finished frame
    fn present(&mut self) -> Result<(), Self::Error>;
}

/// Rotation phase of the overlay, in degrees.
///
/// The value only ever grows. It is not wrapped; [`OverlayPose`] reduces it
/// modulo 360 when building the rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationPhase {
    degrees: f64,
    step: f64,
}

impl AnimationPhase {
    /// Phase starting at 0 and advancing `step` degrees per visible tick
    pub fn new(step: f64) -> Self {
        Self { degrees: 0.0, step }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn advance(&mut self) {
        self.degrees += self.step;
    }
}

/// Outcome of one render tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    /// Flag snapshot taken for this tick
    pub visible: bool,
    /// Phase the overlay was drawn at, if it was drawn
    pub drawn_at: Option<f64>,
}

/// Timer-driven renderer, reader of the visibility flag
pub struct RenderLoop {
    flag: VisibilityFlag,
    phase: AnimationPhase,
    ticks: u64,
}

impl RenderLoop {
    pub fn new(flag: VisibilityFlag, phase: AnimationPhase) -> Self {
        Self {
            flag,
            phase,
            ticks: 0,
        }
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Render one frame.
    ///
    /// The phase advances only when the overlay was drawn, and before the
    /// frame is presented, so a failed present does not stall the animation.
    pub fn tick<D: DisplaySurface>(&mut self, display: &mut D) -> Result<TickReport, D::Error> {
        display.clear();

        let visible = self.flag.snapshot();
        let drawn_at = if visible {
            let at = self.phase.degrees();
            display.draw_overlay(&OverlayPose::at_phase(at));
            self.phase.advance();
            Some(at)
        } else {
            None
        };

        self.ticks += 1;
        display.present()?;
        Ok(TickReport { visible, drawn_at })
    }
}
