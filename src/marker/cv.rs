//! OpenCV-backed detection for the 6x6 ArUco dictionary (`DICT_6X6_250`).
//!
//! Requires OpenCV 4.7+ with the objdetect module installed.

use ::opencv::core::{Mat, Point2f, Vector};
use ::opencv::objdetect::{
    self, ArucoDetector as CvArucoDetector, DetectorParameters, Dictionary,
    PredefinedDictionaryType, RefineParameters,
};
use ::opencv::prelude::*;
use image::GrayImage;

use super::{DetectError, DetectedMarker, MarkerDetector, MarkerFamily, MarkerId, Point2};
use crate::camera::CameraFrame;

fn backend_error(e: ::opencv::Error) -> DetectError {
    DetectError::Backend(format!("OpenCV error: {}", e))
}

fn dictionary() -> Result<Dictionary, DetectError> {
    objdetect::get_predefined_dictionary(PredefinedDictionaryType::DICT_6X6_250)
        .map_err(backend_error)
}

const FAMILY: MarkerFamily = MarkerFamily::Dict6x6_250;

/// Cells per side of a 6x6 marker, border included
const MARKER_CELLS: u32 = 8;

/// Marker detector running OpenCV's ArUco pipeline on `DICT_6X6_250`
pub struct OpenCvDetector {
    detector: CvArucoDetector,
}

impl OpenCvDetector {
    pub fn new() -> Result<Self, DetectError> {
        let dictionary = dictionary()?;
        let parameters = DetectorParameters::default().map_err(backend_error)?;
        let refine = RefineParameters::new_def().map_err(backend_error)?;
        let detector =
            CvArucoDetector::new(&dictionary, &parameters, refine).map_err(backend_error)?;

        log::info!("OpenCV ArUco detector ready ({})", FAMILY);
        Ok(Self { detector })
    }

    /// Find all decodable markers in a luma image
    pub fn detect_luma(&self, gray: &GrayImage) -> Result<Vec<DetectedMarker>, DetectError> {
        let (w, h) = gray.dimensions();
        let image = Mat::new_rows_cols_with_data(h as i32, w as i32, gray.as_raw())
            .map_err(backend_error)?;

        let mut corners: Vector<Vector<Point2f>> = Vector::new();
        let mut ids: Vector<i32> = Vector::new();
        self.detector
            .detect_markers_def(&image, &mut corners, &mut ids)
            .map_err(backend_error)?;

        let mut found: Vec<DetectedMarker> = Vec::new();
        for (id, quad) in ids.iter().zip(corners.iter()) {
            let Ok(id) = MarkerId::try_from(id) else {
                continue;
            };
            if id > FAMILY.max_id() || quad.len() != 4 || found.iter().any(|m| m.id == id) {
                continue;
            }

            let mut points = [Point2::default(); 4];
            for (i, point) in points.iter_mut().enumerate() {
                let p = quad.get(i).map_err(backend_error)?;
                *point = Point2::new(p.x, p.y);
            }
            found.push(DetectedMarker {
                id,
                corners: points,
            });
        }

        Ok(found)
    }
}

impl MarkerDetector for OpenCvDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<DetectedMarker>, DetectError> {
        let gray = frame.to_luma().ok_or(DetectError::MalformedFrame {
            width: frame.width,
            height: frame.height,
            bytes: frame.data.len(),
        })?;
        self.detect_luma(&gray)
    }
}

/// Render a 6x6 marker, one-cell border included, no quiet zone
pub fn render_marker(id: MarkerId, cell_size: u32) -> Option<GrayImage> {
    if id > FAMILY.max_id() {
        return None;
    }
    let side = MARKER_CELLS * cell_size.max(1);

    let dictionary = dictionary().ok()?;
    let mut image = Mat::default();
    if let Err(e) =
        objdetect::generate_image_marker(&dictionary, id as i32, side as i32, &mut image, 1)
    {
        log::warn!("Failed to render marker {}: {}", id, e);
        return None;
    }

    let bytes = image.data_bytes().ok()?.to_vec();
    GrayImage::from_raw(side, side, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{imageops, Luma};

    fn scene(id: MarkerId) -> GrayImage {
        let mut image = GrayImage::from_pixel(240, 180, Luma([255]));
        imageops::overlay(&mut image, &render_marker(id, 10).unwrap(), 60, 40);
        image
    }

    #[test]
    fn test_six_by_six_round_trip() {
        let detector = OpenCvDetector::new().unwrap();
        for id in [0, 17, 249] {
            let markers = detector.detect_luma(&scene(id)).unwrap();
            assert_eq!(markers.len(), 1, "marker {}", id);
            assert_eq!(markers[0].id, id);
            assert!((markers[0].corners[0].x - 60.0).abs() <= 2.0);
            assert!((markers[0].corners[0].y - 40.0).abs() <= 2.0);
        }
    }

    #[test]
    fn test_blank_frame() {
        let detector = OpenCvDetector::new().unwrap();
        let blank = GrayImage::from_pixel(64, 64, Luma([255]));
        assert!(detector.detect_luma(&blank).unwrap().is_empty());
    }

    #[test]
    fn test_render_size() {
        let image = render_marker(0, 10).unwrap();
        assert_eq!(image.dimensions(), (80, 80));
        assert_eq!(image.get_pixel(5, 5).0[0], 0);
        assert!(render_marker(250, 10).is_none());
    }
}
