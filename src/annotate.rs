//! Preview annotation
//!
//! Detected marker outlines are drawn onto a copy of the camera frame before
//! it goes to the preview window. Corner geometry is only ever used here.

use image::Rgba;
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::camera::CameraFrame;
use crate::marker::DetectedMarker;

const OUTLINE: Rgba<u8> = Rgba([0, 255, 0, 255]);
const FIRST_CORNER: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Side of the square marking corner 0
const CORNER_MARK: u32 = 6;

/// Draw marker outlines on a copy of `frame`.
///
/// A malformed frame is returned unchanged.
pub fn annotate_markers(frame: &CameraFrame, markers: &[DetectedMarker]) -> CameraFrame {
    let Some(mut image) = frame.to_rgba_image() else {
        return frame.clone();
    };
    if markers.is_empty() {
        return frame.clone();
    }

    for marker in markers {
        for i in 0..4 {
            let a = marker.corners[i];
            let b = marker.corners[(i + 1) % 4];
            draw_line_segment_mut(&mut image, (a.x, a.y), (b.x, b.y), OUTLINE);
        }

        let first = marker.corners[0];
        let half = (CORNER_MARK / 2) as i32;
        let rect = Rect::at(first.x.round() as i32 - half, first.y.round() as i32 - half)
            .of_size(CORNER_MARK, CORNER_MARK);
        draw_filled_rect_mut(&mut image, rect, FIRST_CORNER);
    }

    CameraFrame {
        timestamp: frame.timestamp,
        ..CameraFrame::from_image(image, frame.frame_number)
    }
}
