//! Coarse-to-fine search for the rotation that makes text level.
//!
//! Each candidate angle is scored by its horizontal ink spread: the mask is
//! rotated, re-thresholded and dilated with a wide flat element so the
//! letters of a line fuse into one band. Level text gives the tightest bands
//! and therefore the least lit area. The score repeats every 180 degrees, so
//! angles live in `[0, 180)` and upside-down text counts as level.
//!
//! Already-level input reports 179, not 0: with the 1 degree bias, 179 is an
//! exact half turn that moves pixels without resampling, which keeps strokes
//! thinner than the slightly blurred 1 degree turn sampled at 0.

use std::collections::BTreeMap;

use image::GrayImage;
use tracing::{debug, instrument};

use crate::error::WisdomError;
use crate::geometry::Rotator;
use crate::image_impl::{self, ThresholdType};
use crate::types::DeskewConfig;

pub struct DeskewSearch {
    pub rotator: Rotator,
    pub rethreshold: u8,
    pub levelling_width: u32,
    pub initial_step: u32,
    pub angle_resolution: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeskewOutcome {
    /// Lowest-spread angle in `[0, 180)`.
    pub best_angle: u32,
    pub best_spread: u64,
    /// Every angle sampled, normalized to `[0, 180)`, with its spread.
    pub samples: BTreeMap<u32, u64>,
    /// Minimum spread over all samples taken so far, after each round.
    pub round_minima: Vec<u64>,
}

impl DeskewOutcome {
    fn level() -> Self {
        Self {
            best_angle: 0,
            best_spread: 0,
            samples: BTreeMap::new(),
            round_minima: Vec::new(),
        }
    }
}

impl DeskewSearch {
    pub fn from_config(cfg: &DeskewConfig) -> Self {
        Self {
            rotator: Rotator::new(cfg.angle_bias),
            rethreshold: cfg.rethreshold,
            levelling_width: cfg.levelling_width,
            initial_step: cfg.initial_step,
            angle_resolution: cfg.angle_resolution,
        }
    }

    /// Rotate to `angle` and recover the ink the resampling dimmed.
    pub fn level(&self, mask: &GrayImage, angle: u32) -> Result<GrayImage, WisdomError> {
        let rotated = self.rotator.rotate(mask, angle as f64)?;
        Ok(image_impl::threshold(&rotated, self.rethreshold, 255, ThresholdType::Binary))
    }

    /// Lit area after levelling at `angle` and smearing horizontally.
    pub fn spread(&self, mask: &GrayImage, angle: u32) -> Result<u64, WisdomError> {
        let levelled = self.level(mask, angle)?;
        let smeared = image_impl::dilate_horizontal(&levelled, self.levelling_width);
        Ok(image_impl::ink_mass(&smeared))
    }

    /// Halve the window around the best angle each round, halving the step
    /// too, until the step reaches the angle resolution. A mask without ink
    /// is level by definition.
    #[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
    pub fn search(&self, mask: &GrayImage) -> Result<DeskewOutcome, WisdomError> {
        if image_impl::ink_mass(mask) == 0 {
            return Ok(DeskewOutcome::level());
        }

        let mut samples: BTreeMap<u32, u64> = BTreeMap::new();
        let mut round_minima = Vec::new();
        let mut start: i64 = 0;
        let mut end: i64 = 180;
        let mut step = self.initial_step.max(1) as i64;
        let mut best = (0u32, u64::MAX);

        loop {
            let mut angle = start;
            while angle < end {
                let key = angle.rem_euclid(180) as u32;
                if !samples.contains_key(&key) {
                    let spread = self.spread(mask, key)?;
                    samples.insert(key, spread);
                }
                angle += step;
            }

            // Ties go to the smallest angle.
            if let Some((&angle, &spread)) = samples.iter().min_by_key(|(&a, &s)| (s, a)) {
                best = (angle, spread);
            }
            round_minima.push(best.1);
            debug!(step, start, end, best_angle = best.0, best_spread = best.1, "deskew round");

            let half_window = (end - start) / 2;
            start = best.0 as i64 - half_window / 2;
            end = best.0 as i64 + half_window / 2;
            step /= 2;
            if step <= self.angle_resolution as i64 {
                break;
            }
        }

        Ok(DeskewOutcome {
            best_angle: best.0,
            best_spread: best.1,
            samples,
            round_minima,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeskewConfig;
    use image::Luma;

    /// Dashes along a line through the center, tilted `tilt` degrees
    /// clockwise on screen.
    fn dashed_line(width: u32, height: u32, tilt: f64) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        let (sin, cos) = tilt.to_radians().sin_cos();
        let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
        for t in -50i32..50 {
            if t.rem_euclid(10) >= 7 {
                continue;
            }
            for n in -1..=1 {
                let x = cx + t as f64 * cos - n as f64 * sin;
                let y = cy + t as f64 * sin + n as f64 * cos;
                img.put_pixel(x.round() as u32, y.round() as u32, Luma([255]));
            }
        }
        img
    }

    fn angle_error(actual: u32, expected: u32) -> u32 {
        let diff = (actual as i64 - expected as i64).rem_euclid(180) as u32;
        diff.min(180 - diff)
    }

    fn search() -> DeskewSearch {
        DeskewSearch::from_config(&DeskewConfig::default())
    }

    #[test]
    fn test_empty_mask_is_level() {
        let outcome = search().search(&GrayImage::new(50, 30)).unwrap();
        assert_eq!(outcome.best_angle, 0);
        assert!(outcome.samples.is_empty());
    }

    #[test]
    fn test_level_line_stays_level() {
        let outcome = search().search(&dashed_line(140, 80, 0.0)).unwrap();
        assert!(angle_error(outcome.best_angle, 0) <= 5, "{outcome:?}");
    }

    #[test]
    fn test_level_input_resolves_to_half_turn() {
        let mask = dashed_line(140, 80, 0.0);
        let search = search();
        let outcome = search.search(&mask).unwrap();
        assert_eq!(outcome.best_angle, 179, "{outcome:?}");
        assert!(outcome.samples[&179] < outcome.samples[&0]);
    }

    #[test]
    fn test_finds_clockwise_tilt() {
        let outcome = search().search(&dashed_line(140, 80, 12.0)).unwrap();
        assert!(angle_error(outcome.best_angle, 12) <= 5, "{outcome:?}");
        assert!(outcome.best_angle < 180);
    }

    #[test]
    fn test_minimum_never_increases() {
        let outcome = search().search(&dashed_line(140, 80, 33.0)).unwrap();
        assert_eq!(outcome.round_minima.len(), 3);
        assert!(outcome.round_minima.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(outcome.round_minima.last(), Some(&outcome.best_spread));
    }

    #[test]
    fn test_search_is_not_exhaustive() {
        let outcome = search().search(&dashed_line(140, 80, 12.0)).unwrap();
        assert!(outcome.samples.len() < 36);
        assert!(outcome.samples.keys().all(|&a| a < 180));
        assert_eq!(outcome.samples[&outcome.best_angle], outcome.best_spread);
    }

    #[test]
    fn test_spread_is_periodic() {
        let mask = dashed_line(140, 80, 12.0);
        let search = search();
        for angle in [0, 12, 47] {
            let a = search.spread(&mask, angle).unwrap() as f64;
            let b = search.spread(&mask, angle + 180).unwrap() as f64;
            assert!((a - b).abs() <= a * 0.02, "angle {angle}: {a} vs {b}");
        }
    }

    #[test]
    fn test_level_angle_has_least_spread() {
        let mask = dashed_line(140, 80, 0.0);
        let search = search();
        let level = search.spread(&mask, 0).unwrap();
        assert!(level < search.spread(&mask, 30).unwrap());
        assert!(level < search.spread(&mask, 90).unwrap());
    }
}
