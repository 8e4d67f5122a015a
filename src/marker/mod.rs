//! Fiducial marker detection
//!
//! Finds ArUco markers in camera frames. Two families are supported: the
//! 6x6 dictionary with 250 ids (through OpenCV, behind the `opencv` feature)
//! and the original ArUco family (7x7 cells, 5x5 data grid), decoded in Rust.
//! A detector reports every marker it can decode; deciding whether the
//! tracked marker is among them is [`contains_marker`].

mod detect;
pub mod dictionary;
mod homography;
#[cfg(feature = "opencv")]
mod cv;
mod synth;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::CameraFrame;

pub use detect::{ArucoDetector, DetectorParams};
#[cfg(feature = "opencv")]
pub use cv::OpenCvDetector;
pub use synth::render_marker;

/// Marker identifier within its family
pub type MarkerId = u16;

/// Marker dictionary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerFamily {
    /// 6x6 data bits, 250 ids (OpenCV `DICT_6X6_250`)
    #[serde(rename = "dict_6x6_250")]
    Dict6x6_250,
    /// Original ArUco codebook, 5x5 data bits, 1024 ids
    #[serde(rename = "aruco_original")]
    ArucoOriginal,
}

impl MarkerFamily {
    /// Largest valid id
    pub fn max_id(self) -> MarkerId {
        match self {
            MarkerFamily::Dict6x6_250 => 249,
            MarkerFamily::ArucoOriginal => dictionary::MAX_ID,
        }
    }

    /// Whether this build can detect the family
    pub fn is_supported(self) -> bool {
        match self {
            MarkerFamily::Dict6x6_250 => cfg!(feature = "opencv"),
            MarkerFamily::ArucoOriginal => true,
        }
    }
}

/// `Dict6x6_250` when built with OpenCV, otherwise the original family
impl Default for MarkerFamily {
    fn default() -> Self {
        if cfg!(feature = "opencv") {
            MarkerFamily::Dict6x6_250
        } else {
            MarkerFamily::ArucoOriginal
        }
    }
}

impl fmt::Display for MarkerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerFamily::Dict6x6_250 => write!(f, "dict_6x6_250"),
            MarkerFamily::ArucoOriginal => write!(f, "aruco_original"),
        }
    }
}

/// A 2D point in image pixel coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// One marker found in a frame
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedMarker {
    /// Decoded marker id
    pub id: MarkerId,
    /// Outer corners, starting at the marker's own top-left and going clockwise
    pub corners: [Point2; 4],
}

/// Detection failures. The detector loop treats them as "no markers".
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("malformed frame: {width}x{height} with {bytes} bytes")]
    MalformedFrame { width: u32, height: u32, bytes: usize },
    #[error("marker family {0} needs a build with the `opencv` feature")]
    UnsupportedFamily(MarkerFamily),
    #[error("detector backend: {0}")]
    Backend(String),
}

/// Something that finds markers in a frame
pub trait MarkerDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<DetectedMarker>, DetectError>;
}

impl<D: MarkerDetector + ?Sized> MarkerDetector for Box<D> {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<DetectedMarker>, DetectError> {
        (**self).detect(frame)
    }
}

/// Build the detector for `params.family`
pub fn create_detector(
    params: &DetectorParams,
) -> Result<Box<dyn MarkerDetector + Send>, DetectError> {
    match params.family {
        MarkerFamily::ArucoOriginal => Ok(Box::new(ArucoDetector::new(params.clone()))),
        #[cfg(feature = "opencv")]
        MarkerFamily::Dict6x6_250 => Ok(Box::new(OpenCvDetector::new()?)),
        #[cfg(not(feature = "opencv"))]
        family @ MarkerFamily::Dict6x6_250 => Err(DetectError::UnsupportedFamily(family)),
    }
}

/// Whether `target` is among the detected markers
pub fn contains_marker(markers: &[DetectedMarker], target: MarkerId) -> bool {
    markers.iter().any(|m| m.id == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: MarkerId) -> DetectedMarker {
        DetectedMarker {
            id,
            corners: [
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
        }
    }

    #[test]
    fn test_contains_marker() {
        assert!(!contains_marker(&[], 0));
        assert!(contains_marker(&[marker(3), marker(0)], 0));
        assert!(!contains_marker(&[marker(3), marker(5)], 0));
    }

    #[test]
    fn test_family_names() {
        let json = serde_json::to_string(&MarkerFamily::Dict6x6_250).unwrap();
        assert_eq!(json, "\"dict_6x6_250\"");
        let family: MarkerFamily = serde_json::from_str("\"aruco_original\"").unwrap();
        assert_eq!(family, MarkerFamily::ArucoOriginal);
        assert_eq!(MarkerFamily::Dict6x6_250.to_string(), "dict_6x6_250");
        assert_eq!(MarkerFamily::Dict6x6_250.max_id(), 249);
        assert_eq!(MarkerFamily::ArucoOriginal.max_id(), 1023);
    }

    #[test]
    fn test_create_original_detector() {
        let params = DetectorParams {
            family: MarkerFamily::ArucoOriginal,
            ..Default::default()
        };
        assert!(create_detector(&params).is_ok());
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_six_by_six_needs_opencv() {
        assert_eq!(MarkerFamily::default(), MarkerFamily::ArucoOriginal);
        assert!(!MarkerFamily::Dict6x6_250.is_supported());

        let params = DetectorParams {
            family: MarkerFamily::Dict6x6_250,
            ..Default::default()
        };
        assert!(matches!(
            create_detector(&params),
            Err(DetectError::UnsupportedFamily(MarkerFamily::Dict6x6_250))
        ));
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_six_by_six_is_default_with_opencv() {
        assert_eq!(MarkerFamily::default(), MarkerFamily::Dict6x6_250);
        assert!(MarkerFamily::Dict6x6_250.is_supported());
        assert!(create_detector(&DetectorParams::default()).is_ok());
    }
}
