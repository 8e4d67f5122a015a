//! Square marker detector
//!
//! Adaptive threshold, outer contours of dark regions, a four-corner fit per
//! contour, then the 7x7 cell grid is sampled through a homography and
//! decoded against the dictionary in all four rotations.

use image::{GrayImage, Luma};
use imageproc::contours::{self, BorderType};

use super::dictionary::{self, BitGrid, DATA_CELLS, MARKER_CELLS};
use super::homography::{quad_area, Homography};
use super::{DetectError, DetectedMarker, MarkerDetector, MarkerFamily, MarkerId, Point2};
use crate::camera::CameraFrame;

/// Tuning for [`ArucoDetector`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Marker dictionary to decode against
    pub family: MarkerFamily,
    /// Half-size of the adaptive threshold window (pixels). 0 picks one from
    /// the frame size.
    pub threshold_radius: u32,
    /// A pixel is dark when it is this far below its local mean.
    pub threshold_offset: i32,
    /// Shortest accepted quad edge (pixels).
    pub min_marker_side: f32,
    /// Minimum spread between the darkest and brightest sampled cell.
    pub min_contrast: u8,
    /// Allowed distance of contour points from the fitted edges, as a
    /// fraction of the mean side length.
    pub edge_tolerance: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            family: MarkerFamily::default(),
            threshold_radius: 0,
            threshold_offset: 7,
            min_marker_side: 14.0,
            min_contrast: 40,
            edge_tolerance: 0.05,
        }
    }
}

/// Cell-space corners of the full marker, border included
const CELL_CORNERS: [[f64; 2]; 4] = [
    [0.0, 0.0],
    [MARKER_CELLS as f64, 0.0],
    [MARKER_CELLS as f64, MARKER_CELLS as f64],
    [0.0, MARKER_CELLS as f64],
];

/// Sub-sample offsets within a cell, in cell units
const SUBSAMPLES: [f64; 3] = [-0.25, 0.0, 0.25];

/// Detector for the original ArUco marker family. Ignores
/// [`DetectorParams::family`]; [`create_detector`](super::create_detector)
/// only hands it out for [`MarkerFamily::ArucoOriginal`].
#[derive(Debug, Clone, Default)]
pub struct ArucoDetector {
    params: DetectorParams,
}

impl ArucoDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// Find all decodable markers in a luma image
    pub fn detect_luma(&self, gray: &GrayImage) -> Vec<DetectedMarker> {
        let (w, h) = gray.dimensions();
        let mut found: Vec<DetectedMarker> = Vec::new();
        if w < MARKER_CELLS as u32 || h < MARKER_CELLS as u32 {
            return found;
        }

        let binary = self.threshold(gray);
        let min_points = (4.0 * self.params.min_marker_side) as usize;

        for contour in contours::find_contours::<i32>(&binary) {
            if contour.border_type != BorderType::Outer || contour.points.len() < min_points {
                continue;
            }

            let points: Vec<Point2> = contour
                .points
                .iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32))
                .collect();

            let Some(corners) = self.fit_quad(&points) else {
                continue;
            };
            let Some((id, turns)) = self.read_cells(gray, &corners) else {
                continue;
            };

            if found.iter().any(|m| m.id == id) {
                log::trace!("Duplicate marker {} ignored", id);
                continue;
            }

            // Canonical corner i sits at observed corner i - turns
            let corners = std::array::from_fn(|i| corners[(i + 4 - turns) % 4]);
            found.push(DetectedMarker { id, corners });
        }

        found
    }

    /// Adaptive mean threshold. Dark pixels become 255 so that contour
    /// tracing follows dark regions.
    fn threshold(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = gray.dimensions();
        let radius = if self.params.threshold_radius == 0 {
            (w.min(h) / 16).max(7)
        } else {
            self.params.threshold_radius
        };

        let integral = integral_image(gray);
        let stride = w as usize + 1;
        let offset = self.params.threshold_offset as i64;

        GrayImage::from_fn(w, h, |x, y| {
            let x0 = x.saturating_sub(radius) as usize;
            let y0 = y.saturating_sub(radius) as usize;
            let x1 = x.saturating_add(radius).saturating_add(1).min(w) as usize;
            let y1 = y.saturating_add(radius).saturating_add(1).min(h) as usize;

            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((x1 - x0) * (y1 - y0)) as i64;
            let value = gray.get_pixel(x, y).0[0] as i64;

            // value < mean - offset, kept in integers
            if value * count < sum as i64 - offset * count {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Fit four corners to a closed contour, clockwise on screen.
    ///
    /// Corners are the contour's extreme points: the point farthest from the
    /// centroid, the point farthest from that one, and the points farthest on
    /// either side of the diagonal they span.
    fn fit_quad(&self, points: &[Point2]) -> Option<[Point2; 4]> {
        let n = points.len() as f32;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |acc, p| (acc.0 + p.x, acc.1 + p.y));
        let centroid = Point2::new(sx / n, sy / n);

        let c0 = *farthest_from(points, &centroid)?;
        let c2 = *farthest_from(points, &c0)?;

        let side = |p: &Point2| (c2.x - c0.x) * (p.y - c0.y) - (c2.y - c0.y) * (p.x - c0.x);
        let c1 = *points
            .iter()
            .max_by(|a, b| side(a).total_cmp(&side(b)))?;
        let c3 = *points
            .iter()
            .min_by(|a, b| side(a).total_cmp(&side(b)))?;
        if side(&c1) <= 0.0 || side(&c3) >= 0.0 {
            return None;
        }

        let mut corners = [c0, c1, c2, c3];
        if quad_area(&corners) < 0.0 {
            corners = [c0, c3, c2, c1];
        }

        let sides: Vec<f32> = (0..4)
            .map(|i| corners[i].distance(&corners[(i + 1) % 4]))
            .collect();
        if sides.iter().any(|&s| s < self.params.min_marker_side) {
            return None;
        }

        let mean_side = sides.iter().sum::<f32>() / 4.0;
        let tolerance = (self.params.edge_tolerance * mean_side).max(2.0);
        let straight = points.iter().all(|p| {
            (0..4)
                .map(|i| line_distance(p, &corners[i], &corners[(i + 1) % 4]))
                .fold(f32::INFINITY, f32::min)
                <= tolerance
        });

        straight.then_some(corners)
    }

    /// Sample the cell grid inside `corners` and decode it
    fn read_cells(&self, gray: &GrayImage, corners: &[Point2; 4]) -> Option<(MarkerId, usize)> {
        let homography = Homography::from_correspondences(&CELL_CORNERS, corners)?;

        let mut cells = [[0.0f64; MARKER_CELLS]; MARKER_CELLS];
        for (row, values) in cells.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = sample_cell(gray, &homography, row, col)?;
            }
        }

        let (lo, hi) = cells
            .iter()
            .flatten()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if hi - lo < self.params.min_contrast as f64 {
            return None;
        }
        let mid = (lo + hi) / 2.0;

        let last = MARKER_CELLS - 1;
        for (row, values) in cells.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                let on_border = row == 0 || col == 0 || row == last || col == last;
                if on_border && value > mid {
                    return None;
                }
            }
        }

        let mut grid: BitGrid = [[false; DATA_CELLS]; DATA_CELLS];
        for (row, bits) in grid.iter_mut().enumerate() {
            for (col, bit) in bits.iter_mut().enumerate() {
                *bit = cells[row + 1][col + 1] > mid;
            }
        }

        dictionary::decode(&grid)
    }
}

impl MarkerDetector for ArucoDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<DetectedMarker>, DetectError> {
        let gray = frame.to_luma().ok_or(DetectError::MalformedFrame {
            width: frame.width,
            height: frame.height,
            bytes: frame.data.len(),
        })?;
        Ok(self.detect_luma(&gray))
    }
}

/// Summed-area table with one row and column of zero padding
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = w as usize + 1;
    let mut table = vec![0u64; stride * (h as usize + 1)];

    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.get_pixel(x as u32, y as u32).0[0] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }
    table
}

fn farthest_from<'a>(points: &'a [Point2], origin: &Point2) -> Option<&'a Point2> {
    points
        .iter()
        .max_by(|a, b| a.distance(origin).total_cmp(&b.distance(origin)))
}

/// Distance from `p` to the infinite line through `a` and `b`
fn line_distance(p: &Point2, a: &Point2, b: &Point2) -> f32 {
    let length = a.distance(b);
    if length < f32::EPSILON {
        return p.distance(a);
    }
    ((b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)).abs() / length
}

/// Mean luma over a 3x3 sub-grid around the cell centre
fn sample_cell(gray: &GrayImage, homography: &Homography, row: usize, col: usize) -> Option<f64> {
    let (w, h) = gray.dimensions();
    let mut total = 0.0;

    for dy in SUBSAMPLES {
        for dx in SUBSAMPLES {
            let (u, v) = homography.project(col as f64 + 0.5 + dx, row as f64 + 0.5 + dy)?;
            let (x, y) = (u.round(), v.round());
            if x < 0.0 || y < 0.0 || x >= w as f64 || y >= h as f64 {
                return None;
            }
            total += gray.get_pixel(x as u32, y as u32).0[0] as f64;
        }
    }

    Some(total / (SUBSAMPLES.len() * SUBSAMPLES.len()) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::render_marker;
    use image::imageops;

    fn canvas(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255]))
    }

    fn original_marker(id: MarkerId) -> GrayImage {
        render_marker(MarkerFamily::ArucoOriginal, id, 10).unwrap()
    }

    fn to_frame(gray: &GrayImage) -> CameraFrame {
        let rgba = image::DynamicImage::ImageLuma8(gray.clone()).to_rgba8();
        CameraFrame::from_image(rgba, 0)
    }

    fn assert_near(p: Point2, x: f32, y: f32) {
        assert!(
            (p.x - x).abs() <= 1.5 && (p.y - y).abs() <= 1.5,
            "expected ({}, {}), got {:?}",
            x,
            y,
            p
        );
    }

    #[test]
    fn test_detects_upright_marker() {
        let mut image = canvas(200, 160);
        imageops::overlay(&mut image, &original_marker(0), 60, 40);

        let mut detector = ArucoDetector::default();
        let markers = detector.detect(&to_frame(&image)).unwrap();

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, 0);
        assert_near(markers[0].corners[0], 60.0, 40.0);
        assert_near(markers[0].corners[1], 129.0, 40.0);
        assert_near(markers[0].corners[2], 129.0, 109.0);
        assert_near(markers[0].corners[3], 60.0, 109.0);
    }

    #[test]
    fn test_detects_rotated_marker() {
        // Turned a quarter clockwise, the marker's top-left ends up top-right
        let marker = imageops::rotate90(&original_marker(0));
        let mut image = canvas(200, 160);
        imageops::overlay(&mut image, &marker, 60, 40);

        let markers = ArucoDetector::default().detect_luma(&image);

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, 0);
        assert_near(markers[0].corners[0], 129.0, 40.0);
        assert_near(markers[0].corners[1], 129.0, 109.0);
    }

    #[test]
    fn test_detects_several_ids() {
        let mut image = canvas(320, 160);
        imageops::overlay(&mut image, &original_marker(3), 30, 40);
        imageops::overlay(&mut image, &original_marker(700), 200, 40);

        let mut ids: Vec<MarkerId> = ArucoDetector::default()
            .detect_luma(&image)
            .iter()
            .map(|m| m.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![3, 700]);
    }

    #[test]
    fn test_blank_frame() {
        let image = canvas(120, 90);
        assert!(ArucoDetector::default().detect_luma(&image).is_empty());
    }

    #[test]
    fn test_plain_square_is_not_a_marker() {
        let mut image = canvas(200, 160);
        let square = GrayImage::from_pixel(70, 70, Luma([0]));
        imageops::overlay(&mut image, &square, 60, 40);
        assert!(ArucoDetector::default().detect_luma(&image).is_empty());
    }

    #[test]
    fn test_malformed_frame() {
        let frame = CameraFrame {
            data: vec![0; 16],
            width: 10,
            height: 10,
            frame_number: 0,
            timestamp: std::time::Instant::now(),
        };
        let result = ArucoDetector::default().detect(&frame);
        assert!(matches!(result, Err(DetectError::MalformedFrame { .. })));
    }

    #[test]
    fn test_oversized_threshold_radius() {
        let mut image = canvas(200, 160);
        imageops::overlay(&mut image, &original_marker(0), 60, 40);

        let detector = ArucoDetector::new(DetectorParams {
            threshold_radius: u32::MAX,
            ..Default::default()
        });
        assert!(detector.detect_luma(&canvas(32, 32)).is_empty());

        // Window clamps to the whole frame
        let markers = detector.detect_luma(&image);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, 0);
    }

    #[test]
    fn test_integral_image() {
        let image = GrayImage::from_pixel(3, 2, Luma([2]));
        let table = integral_image(&image);
        assert_eq!(table.len(), 4 * 3);
        assert_eq!(table[2 * 4 + 3], 12);
        assert_eq!(table[4 + 1], 2);
    }
}
