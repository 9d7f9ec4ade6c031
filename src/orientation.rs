//! Hough-style orientation voting.
//!
//! Every ink pixel votes, for each whole degree θ in `[-90, 90)`, for the
//! signed offset `ρ = floor(x·cosθ + y·sinθ)` of the line through it with
//! normal θ, measured from a chosen center. Straight strokes pile their
//! votes into a single cell; blobs smear theirs across every angle.
//!
//! Voting around the ink centroid rather than the geometric center keeps
//! skewed content from drifting across ρ, at the cost of a wider
//! accumulator.

use image::{GrayImage, Luma};
use ndarray::Array2;
use tracing::{debug, instrument};

use crate::image_impl::{Moments, Point2d};

pub const ANGLES: usize = 180;

// cos(-90°) is not exactly zero; without this, offsets that are whole
// numbers floor one cell low for half the pixels of a horizontal stroke.
const ROUND_OFF: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct OrientationTransform {
    pub center_on_centroid: bool,
}

/// Votes indexed by `[θ + 90, ρ + width / 2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub votes: Array2<u32>,
    pub center: Point2d,
}

impl OrientationTransform {
    pub fn new(center_on_centroid: bool) -> Self {
        Self { center_on_centroid }
    }

    #[instrument(skip_all, fields(centroid = self.center_on_centroid))]
    pub fn transform(&self, mask: &GrayImage) -> Accumulator {
        let (width, height) = mask.dimensions();
        let center = self.voting_center(mask);

        let max_dx = center.x.max(width as f64 - center.x);
        let max_dy = center.y.max(height as f64 - center.y);
        let half = (max_dx.hypot(max_dy)).ceil() as i64;
        let acc_width = (half * 2).max(1) as usize;

        let ink: Vec<(f64, f64)> = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x as f64 - center.x, y as f64 - center.y))
            .collect();

        let mut votes = Array2::<u32>::zeros((ANGLES, acc_width));
        for (row, mut cells) in votes.rows_mut().into_iter().enumerate() {
            let theta = (row as f64 - 90.0).to_radians();
            let (sin, cos) = theta.sin_cos();
            for &(x, y) in &ink {
                let rho = (x * cos + y * sin + ROUND_OFF).floor() as i64 + half;
                if let Some(cell) = usize::try_from(rho).ok().and_then(|i| cells.get_mut(i)) {
                    *cell += 1;
                }
            }
        }

        debug!(
            ink = ink.len(),
            acc_width,
            center_x = center.x,
            center_y = center.y,
            "orientation votes accumulated"
        );
        Accumulator { votes, center }
    }

    /// Ink centroid when requested and defined, otherwise the geometric center.
    fn voting_center(&self, mask: &GrayImage) -> Point2d {
        let geometric = Point2d::new(mask.width() as f64 / 2.0, mask.height() as f64 / 2.0);
        if !self.center_on_centroid {
            return geometric;
        }
        Moments::binary(mask).centroid().unwrap_or(geometric)
    }
}

impl Accumulator {
    pub fn width(&self) -> usize {
        self.votes.ncols()
    }

    /// Linear min-max stretch to `[0, 255]`. Uniform votes map to 0.
    pub fn normalized(&self) -> Array2<u8> {
        let min = self.votes.iter().copied().min().unwrap_or(0);
        let max = self.votes.iter().copied().max().unwrap_or(0);
        if max == min {
            return Array2::zeros(self.votes.raw_dim());
        }
        let range = (max - min) as f64;
        self.votes
            .mapv(|v| ((v - min) as f64 * 255.0 / range).round() as u8)
    }

    /// Normalized votes as an image, one row per angle.
    pub fn to_image(&self) -> GrayImage {
        let normalized = self.normalized();
        GrayImage::from_fn(self.width() as u32, ANGLES as u32, |x, y| {
            Luma([normalized[[y as usize, x as usize]]])
        })
    }

    /// Full-turn view: rows 180..360 repeat rows 0..180 mirrored left to
    /// right, since ρ(θ + 180°) = -ρ(θ).
    pub fn mirrored(&self) -> GrayImage {
        let normalized = self.normalized();
        let width = self.width();
        GrayImage::from_fn(width as u32, 2 * ANGLES as u32, |x, y| {
            let (row, col) = if (y as usize) < ANGLES {
                (y as usize, x as usize)
            } else {
                (y as usize - ANGLES, width - 1 - x as usize)
            };
            Luma([normalized[[row, col]]])
        })
    }
}
