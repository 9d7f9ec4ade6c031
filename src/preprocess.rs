use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument};

use crate::image_impl::{self, Size, ThresholdType};
use crate::types::PrepareConfig;

/// Turns a color scan into the reduced, inverted binary ink mask every other
/// stage works on.
pub struct MaskPreparer {
    pub scale: f32,
    pub ink_threshold: u8,
}

impl MaskPreparer {
    pub fn new(scale: f32, ink_threshold: u8) -> Self {
        Self {
            scale,
            ink_threshold,
        }
    }

    pub fn from_config(cfg: &PrepareConfig) -> Self {
        Self::new(cfg.scale, cfg.ink_threshold)
    }

    #[instrument(skip_all, fields(width = img.width(), height = img.height()))]
    pub fn run(&self, img: &DynamicImage) -> GrayImage {
        let gray = image_impl::cvt_gray(img);
        let reduced = self.resize(&gray);
        let mask = image_impl::threshold(&reduced, self.ink_threshold, 255, ThresholdType::BinaryInv);
        debug!(
            width = mask.width(),
            height = mask.height(),
            ink = image_impl::ink_mass(&mask),
            "prepared ink mask"
        );
        mask
    }

    fn resize(&self, gray: &GrayImage) -> GrayImage {
        let dsize = Size::of(gray).scaled(self.scale);
        image_impl::resize(gray, dsize)
    }
}
