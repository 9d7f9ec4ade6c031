use image::GrayImage;
use tracing::debug;

use crate::image_impl;

/// Decides blankness from the total ink of the unrotated mask, so the answer
/// cannot depend on any angle.
#[derive(Debug, Clone, Copy)]
pub struct BlankDetector {
    pub minimum_ink: u64,
}

impl BlankDetector {
    pub fn new(minimum_ink: u64) -> Self {
        Self { minimum_ink }
    }

    pub fn is_blank(&self, prepared: &GrayImage) -> bool {
        let ink = image_impl::ink_mass(prepared);
        debug!(ink, minimum_ink = self.minimum_ink, "blank check");
        ink <= self.minimum_ink
    }
}
