//! Marker image generation

use image::{GrayImage, Luma};

use super::dictionary::{self, DATA_CELLS, MARKER_CELLS};
use super::{MarkerFamily, MarkerId};

/// Render marker `id` of `family` as a square image of `cell_size` pixel
/// cells, border included and no quiet zone.
///
/// `None` if the id is out of range, or for the 6x6 family in builds
/// without the `opencv` feature.
pub fn render_marker(family: MarkerFamily, id: MarkerId, cell_size: u32) -> Option<GrayImage> {
    match family {
        MarkerFamily::ArucoOriginal => render_original(id, cell_size),
        #[cfg(feature = "opencv")]
        MarkerFamily::Dict6x6_250 => super::cv::render_marker(id, cell_size),
        #[cfg(not(feature = "opencv"))]
        MarkerFamily::Dict6x6_250 => None,
    }
}

fn render_original(id: MarkerId, cell_size: u32) -> Option<GrayImage> {
    let grid = dictionary::encode(id)?;
    let cell_size = cell_size.max(1);
    let side = MARKER_CELLS as u32 * cell_size;

    let image = GrayImage::from_fn(side, side, |x, y| {
        let col = (x / cell_size) as usize;
        let row = (y / cell_size) as usize;
        let inner = (1..=DATA_CELLS).contains(&row) && (1..=DATA_CELLS).contains(&col);
        if inner && grid[row - 1][col - 1] {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    Some(image)
}
