//! Marker Overlay - animated 3D overlay driven by fiducial marker detection
//!
//! A detector thread pulls camera frames, looks for one ArUco marker and
//! publishes whether it is visible. The window thread renders a rotating quad
//! on a fixed timer whenever the last published value says the marker is in
//! view.

pub mod annotate;
pub mod app;
pub mod camera;
pub mod config;
pub mod detector;
pub mod marker;
pub mod overlay;
pub mod preview;
pub mod render;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

pub use app::Graphics;
pub use config::OverlayConfig;
pub use detector::{DetectorExit, DetectorHandle, DetectorLoop};
pub use marker::{ArucoDetector, DetectedMarker, MarkerDetector, MarkerFamily, MarkerId};
pub use render::{AnimationPhase, DisplaySurface, RenderLoop, RepeatingTimer};
pub use visibility::VisibilityFlag;
