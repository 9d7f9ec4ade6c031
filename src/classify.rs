//! Text-versus-drawing decision over the orientation accumulator.
//!
//! Ruled handwriting leaves a parallel-line signature in the full-turn
//! accumulator: dense peaks bunched around the orientation of horizontal
//! strokes. The decision rule is fixed here; spotting the signature is the
//! job of a [`PatternPredicate`], so a trained detector can replace the
//! built-in [`PeakDensityPredicate`].

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::image_impl;
use crate::orientation::{OrientationTransform, ANGLES};
use crate::types::PeakConfig;

/// Axis-aligned box in accumulator pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Finds text signatures in a mirrored, normalized accumulator image.
pub trait PatternPredicate {
    fn detect(&self, accumulator: &GrayImage) -> Vec<Region>;
}

impl<F> PatternPredicate for F
where
    F: Fn(&GrayImage) -> Vec<Region>,
{
    fn detect(&self, accumulator: &GrayImage) -> Vec<Region> {
        self(accumulator)
    }
}

/// Reports one region per horizontal-line band when most of the strong
/// accumulator cells sit in those bands.
#[derive(Debug, Clone, Default)]
pub struct PeakDensityPredicate {
    pub cfg: PeakConfig,
}

impl PeakDensityPredicate {
    pub fn new(cfg: PeakConfig) -> Self {
        Self { cfg }
    }

    fn axis_band(&self, row: u32) -> Option<u32> {
        let angles = ANGLES as u32;
        let phase = row % angles;
        let distance = phase.min(angles - phase);
        (distance <= self.cfg.axis_band_degrees).then(|| (row + self.cfg.axis_band_degrees) / angles)
    }
}

impl PatternPredicate for PeakDensityPredicate {
    fn detect(&self, accumulator: &GrayImage) -> Vec<Region> {
        let cutoff = ((self.cfg.peak_fraction * 255.0).round() as u8).max(1);
        // Per band: (min_x, min_y, max_x, max_y).
        let mut bands: Vec<Option<(u32, u32, u32, u32)>> = vec![None; 3];
        let mut strong = 0usize;
        let mut aligned = 0usize;

        for (x, y, p) in accumulator.enumerate_pixels() {
            if p[0] < cutoff {
                continue;
            }
            strong += 1;
            let Some(band) = self.axis_band(y) else {
                continue;
            };
            aligned += 1;
            let band = band as usize;
            if band >= bands.len() {
                bands.resize(band + 1, None);
            }
            bands[band] = Some(match bands[band] {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        if strong == 0 {
            return Vec::new();
        }
        let share = aligned as f64 / strong as f64;
        debug!(strong, aligned, share, "accumulator peak density");
        if share < self.cfg.min_axis_share {
            return Vec::new();
        }

        bands
            .into_iter()
            .flatten()
            .map(|(x0, y0, x1, y1)| Region {
                x: x0,
                y: y0,
                width: x1 - x0 + 1,
                height: y1 - y0 + 1,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub is_drawing: bool,
    pub regions: Vec<Region>,
    /// Mirrored accumulator the predicate saw; empty when the mask had no ink.
    pub accumulator: GrayImage,
}

pub struct DrawingClassifier {
    pub transform: OrientationTransform,
    predicate: Box<dyn PatternPredicate>,
}

impl DrawingClassifier {
    pub fn new(transform: OrientationTransform, predicate: Box<dyn PatternPredicate>) -> Self {
        Self {
            transform,
            predicate,
        }
    }

    pub fn with_peak_density(transform: OrientationTransform, cfg: PeakConfig) -> Self {
        Self::new(transform, Box::new(PeakDensityPredicate::new(cfg)))
    }

    pub fn is_drawing(&self, mask: &GrayImage) -> bool {
        self.classify(mask).is_drawing
    }

    /// A mask without ink carries no drawing. Otherwise it is a drawing
    /// exactly when the predicate finds no text signature.
    #[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
    pub fn classify(&self, mask: &GrayImage) -> Classification {
        if image_impl::ink_mass(mask) == 0 {
            return Classification {
                is_drawing: false,
                regions: Vec::new(),
                accumulator: GrayImage::new(0, 0),
            };
        }
        let mirrored = self.transform.transform(mask).mirrored();
        let regions = self.predicate.detect(&mirrored);
        let is_drawing = regions.is_empty();
        debug!(regions = regions.len(), is_drawing, "drawing classification");
        Classification {
            is_drawing,
            regions,
            accumulator: mirrored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn classifier() -> DrawingClassifier {
        DrawingClassifier::with_peak_density(OrientationTransform::new(true), PeakConfig::default())
    }

    fn disc(side: u32, radius: f64) -> GrayImage {
        let c = side as f64 / 2.0;
        GrayImage::from_fn(side, side, |x, y| {
            let (dx, dy) = (x as f64 + 0.5 - c, y as f64 + 0.5 - c);
            Luma([if dx.hypot(dy) <= radius { 255 } else { 0 }])
        })
    }

    fn text_bands() -> GrayImage {
        let mut img = GrayImage::new(160, 100);
        for top in [15, 45, 75] {
            for y in top..top + 10 {
                for x in 10..150 {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }
        img
    }

    #[test]
    fn test_axis_band_wraps_around_the_turn() {
        let predicate = PeakDensityPredicate::default();
        assert_eq!(predicate.axis_band(0), Some(0));
        assert_eq!(predicate.axis_band(10), Some(0));
        assert_eq!(predicate.axis_band(11), None);
        assert_eq!(predicate.axis_band(90), None);
        assert_eq!(predicate.axis_band(170), Some(1));
        assert_eq!(predicate.axis_band(190), Some(1));
        assert_eq!(predicate.axis_band(355), Some(2));
    }

    #[test]
    fn test_disc_is_a_drawing() {
        let result = classifier().classify(&disc(80, 30.0));
        assert!(result.is_drawing);
        assert!(result.regions.is_empty());
        assert_eq!(result.accumulator.height(), 360);
    }

    #[test]
    fn test_ruled_text_is_not_a_drawing() {
        let result = classifier().classify(&text_bands());
        assert!(!result.is_drawing);
        assert!(!result.regions.is_empty());
        for region in &result.regions {
            let row = region.y % ANGLES as u32;
            assert!(row <= 10 || row >= 170, "{region:?}");
        }
    }

    #[test]
    fn test_empty_mask_is_not_a_drawing() {
        assert!(!classifier().is_drawing(&GrayImage::new(30, 30)));
    }

    #[test]
    fn test_empty_mask_skips_the_transform() {
        let consulted = |_: &GrayImage| -> Vec<Region> { panic!("predicate consulted") };
        let classifier = DrawingClassifier::new(OrientationTransform::new(true), Box::new(consulted));
        let result = classifier.classify(&GrayImage::new(30, 30));
        assert!(!result.is_drawing);
        assert_eq!(result.accumulator.dimensions(), (0, 0));
    }

    #[test]
    fn test_closure_predicate_is_honored() {
        let always_text = |_: &GrayImage| {
            vec![Region {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            }]
        };
        let never_text = |_: &GrayImage| -> Vec<Region> { Vec::new() };
        let transform = OrientationTransform::new(true);
        let shape = disc(40, 15.0);
        assert!(!DrawingClassifier::new(transform, Box::new(always_text)).is_drawing(&shape));
        assert!(DrawingClassifier::new(transform, Box::new(never_text)).is_drawing(&text_bands()));
    }
}
