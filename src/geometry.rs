use image::GrayImage;
use tracing::trace;

use crate::error::WisdomError;
use crate::image_impl::{self, Point2d, Size};

/// Rotates masks onto a square canvas whose side is the ceiling of the
/// mask's diagonal, so every angle yields the same dimensions and nothing
/// is clipped.
#[derive(Debug, Clone, Copy)]
pub struct Rotator {
    /// Degrees added to every requested angle.
    pub angle_bias: f64,
}

impl Rotator {
    pub fn new(angle_bias: f64) -> Self {
        Self { angle_bias }
    }

    /// Side of the square canvas for a `width` x `height` mask.
    pub fn canvas_side(width: u32, height: u32) -> u32 {
        let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();
        (diagonal.ceil() as u32).max(width).max(height)
    }

    /// Rotate `mask` counter-clockwise by `angle + angle_bias` degrees about
    /// the canvas center. The result is a resampled grid, not re-thresholded.
    pub fn rotate(&self, mask: &GrayImage, angle: f64) -> Result<GrayImage, WisdomError> {
        let canvas = pad_to_square(mask);
        let side = canvas.width();
        let mid = (side as f64 - 1.0) / 2.0;
        let center = Point2d::new(mid, mid);
        let matrix = image_impl::get_rotation_matrix_2d(center, angle + self.angle_bias, 1.0);
        trace!(angle, side, "rotating mask");
        Ok(image_impl::warp_affine(&canvas, &matrix, Size::new(side, side), 0)?)
    }
}

/// Pad symmetrically with 0 up to the diagonal-sized square. Odd leftovers go
/// to the bottom and right edges.
fn pad_to_square(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let side = Rotator::canvas_side(width, height);
    let extend_h = side - height;
    let extend_w = side - width;
    let top = extend_h / 2;
    let left = extend_w / 2;
    image_impl::copy_make_border(mask, top, extend_h - top, left, extend_w - left, 0)
}
