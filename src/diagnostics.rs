//! Optional side channel that dumps intermediate images for offline review.
//!
//! Nothing reads these files back. A sink that cannot write logs a warning
//! and carries on, so analysis never fails because of it.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, warn};

use crate::image_impl;
use crate::lines::{InkProfile, LineAnalysis};

/// Columns reserved beside the mask for the profile plot.
const PLOT_WIDTH: u32 = 100;
const BODY_SHADE: u8 = 255;
const SKIRT_SHADE: u8 = 110;

#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    dir: PathBuf,
}

impl DiagnosticSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: &str, name: &str) -> PathBuf {
        self.dir.join(format!("{kind}-{name}.png"))
    }

    pub fn prepared(&self, name: &str, mask: &GrayImage) {
        self.save("prepared", name, mask);
    }

    pub fn rotated(&self, name: &str, mask: &GrayImage) {
        self.save("rotated", name, mask);
    }

    pub fn accumulator(&self, name: &str, mirrored: &GrayImage) {
        self.save("accumulator", name, mirrored);
    }

    /// The levelled mask with its smoothed row profile plotted to the right;
    /// rows inside the text body are drawn brighter.
    pub fn profile(&self, name: &str, levelled: &GrayImage, profile: &InkProfile, analysis: &LineAnalysis) {
        self.save("profile", name, &render_profile(levelled, profile, analysis));
    }

    fn save(&self, kind: &str, name: &str, img: &GrayImage) {
        let path = self.path_for(kind, name);
        let written = std::fs::create_dir_all(&self.dir)
            .map_err(|e| e.to_string())
            .and_then(|_| {
                image_impl::imwrite(&path, &DynamicImage::ImageLuma8(img.clone()))
                    .map_err(|e| e.to_string())
            });
        match written {
            Ok(()) => debug!(path = %path.display(), "wrote diagnostic image"),
            Err(err) => warn!(path = %path.display(), %err, "could not write diagnostic image"),
        }
    }
}

fn render_profile(levelled: &GrayImage, profile: &InkProfile, analysis: &LineAnalysis) -> GrayImage {
    let (width, height) = levelled.dimensions();
    let smoothed = profile.smoothed();
    let peak = smoothed.iter().copied().fold(0.0, f64::max);
    let mut canvas = GrayImage::new(width + PLOT_WIDTH, height);
    image::imageops::replace(&mut canvas, levelled, 0, 0);
    if peak <= 0.0 {
        return canvas;
    }

    for (row, &mean) in smoothed.iter().enumerate() {
        let bar = (mean.max(0.0) / peak * PLOT_WIDTH as f64).round() as u32;
        let in_body = analysis.body.as_ref().is_some_and(|body| body.contains(&row));
        let shade = if in_body { BODY_SHADE } else { SKIRT_SHADE };
        for dx in 0..bar.min(PLOT_WIDTH) {
            canvas.put_pixel(width + dx, row as u32, Luma([shade]));
        }
    }
    canvas
}
