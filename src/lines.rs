//! Line counting from the horizontal ink profile of a levelled mask.
//!
//! The row profile is smoothed, trimmed to the text body and differentiated.
//! Each derivative sample becomes `U`, `D` or `F` (up, down, flat), and every
//! non-overlapping `U+F*D+` run in that string is one line: ink rising into
//! it, maybe a plateau, then falling out. A profile dominated by samples no
//! run explains is noise, and reports zero lines.

use std::ops::Range;

use image::GrayImage;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, instrument};

use crate::image_impl;
use crate::types::LineConfig;

lazy_static! {
    /// Ink rising into a line, an optional plateau, then falling out of it.
    static ref LINE_SHAPE: Regex = Regex::new("U+F*D+").unwrap();
}

/// Row-wise ink counts plus their centered moving sum.
///
/// The smoothed profile is kept as integer window sums: dividing by the
/// window length would not change any comparison, and integers keep "flat"
/// an exact zero.
#[derive(Debug, Clone, PartialEq)]
pub struct InkProfile {
    pub raw: Vec<u32>,
    pub window_sums: Vec<i64>,
    pub window: usize,
}

impl InkProfile {
    pub fn from_mask(mask: &GrayImage, half_width: usize) -> Self {
        Self::from_counts(image_impl::row_profile(mask), half_width)
    }

    pub fn from_counts(raw: Vec<u32>, half_width: usize) -> Self {
        let values: Vec<i64> = raw.iter().map(|&v| v as i64).collect();
        Self {
            window_sums: moving_sum(&values, half_width),
            window: 2 * half_width + 1,
            raw,
        }
    }

    /// Moving average, for display.
    pub fn smoothed(&self) -> Vec<f64> {
        self.window_sums
            .iter()
            .map(|&s| s as f64 / self.window as f64)
            .collect()
    }
}

/// Centered sum over `[i - half_width, i + half_width]`, zero outside.
fn moving_sum(values: &[i64], half_width: usize) -> Vec<i64> {
    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0i64);
    for &v in values {
        prefix.push(prefix[prefix.len() - 1] + v);
    }
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half_width);
            let hi = (i + half_width + 1).min(values.len());
            prefix[hi] - prefix[lo]
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineAnalysis {
    pub line_count: usize,
    /// Rows of the text body, if any row cleared the noise threshold.
    pub body: Option<Range<usize>>,
    pub signs: String,
    pub matches: usize,
    pub unmatched_ratio: f64,
}

impl LineAnalysis {
    fn empty() -> Self {
        Self {
            line_count: 0,
            body: None,
            signs: String::new(),
            matches: 0,
            unmatched_ratio: 1.0,
        }
    }
}

pub struct LineCounter {
    pub cfg: LineConfig,
}

impl LineCounter {
    pub fn new(cfg: LineConfig) -> Self {
        Self { cfg }
    }

    pub fn count(&self, levelled: &GrayImage) -> usize {
        self.analyze(levelled).line_count
    }

    #[instrument(skip_all, fields(height = levelled.height()))]
    pub fn analyze(&self, levelled: &GrayImage) -> LineAnalysis {
        let profile = InkProfile::from_mask(levelled, self.cfg.smoothing_half_width);
        self.analyze_profile(&profile)
    }

    pub fn analyze_profile(&self, profile: &InkProfile) -> LineAnalysis {
        let Some(body) = self.text_body(&profile.window_sums) else {
            debug!("no row above the noise threshold");
            return LineAnalysis::empty();
        };

        let trimmed = &profile.window_sums[body.clone()];
        let derivative: Vec<i64> = trimmed.windows(2).map(|w| w[1] - w[0]).collect();
        let derivative = moving_sum(&derivative, self.cfg.derivative_half_width);
        let signs: String = derivative
            .iter()
            .map(|&d| match d.signum() {
                1 => 'U',
                -1 => 'D',
                _ => 'F',
            })
            .collect();

        if signs.is_empty() {
            return LineAnalysis {
                body: Some(body),
                ..LineAnalysis::empty()
            };
        }

        let (matches, covered) = LINE_SHAPE
            .find_iter(&signs)
            .fold((0usize, 0usize), |(n, len), m| (n + 1, len + m.len()));
        let unmatched_ratio = (signs.len() - covered) as f64 / signs.len() as f64;
        let line_count = if unmatched_ratio > self.cfg.max_unmatched_ratio {
            0
        } else {
            matches
        };

        debug!(
            body_start = body.start,
            body_end = body.end,
            matches,
            unmatched_ratio,
            line_count,
            "line profile analysed"
        );

        LineAnalysis {
            line_count,
            body: Some(body),
            signs,
            matches,
            unmatched_ratio,
        }
    }

    /// Scan in from both ends to the first rows above the noise threshold,
    /// then back out while the profile stays positive to keep each line's
    /// rising and falling skirt.
    fn text_body(&self, sums: &[i64]) -> Option<Range<usize>> {
        let peak = sums.iter().copied().max().filter(|&p| p > 0)?;
        let threshold = peak as f64 * self.cfg.noise_fraction;

        let mut top = sums.iter().position(|&s| s as f64 > threshold)?;
        let mut bottom = sums.iter().rposition(|&s| s as f64 > threshold)?;

        while top > 0 && sums[top - 1] > 0 {
            top -= 1;
        }
        while bottom + 1 < sums.len() && sums[bottom + 1] > 0 {
            bottom += 1;
        }

        Some(top..bottom + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn counter() -> LineCounter {
        LineCounter::new(LineConfig::default())
    }

    /// `bands` horizontal bars of ink, `thickness` rows each, `gap` rows apart.
    fn banded_mask(bands: u32, thickness: u32, gap: u32) -> GrayImage {
        let margin = 15;
        let height = 2 * margin + bands * thickness + (bands - 1) * gap;
        let mut img = GrayImage::new(160, height);
        for band in 0..bands {
            let top = margin + band * (thickness + gap);
            for y in top..top + thickness {
                for x in 10..150 {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }
        img
    }

    #[test]
    fn test_moving_sum_zero_pads() {
        assert_eq!(moving_sum(&[1, 1, 1, 1], 1), vec![2, 3, 3, 2]);
        assert_eq!(moving_sum(&[], 5), Vec::<i64>::new());
    }

    #[test]
    fn test_counts_three_bands() {
        let analysis = counter().analyze(&banded_mask(3, 10, 20));
        assert_eq!(analysis.line_count, 3, "{analysis:?}");
        assert_eq!(analysis.matches, 3);
        assert!(analysis.unmatched_ratio <= 0.7);
    }

    #[test]
    fn test_counts_single_band() {
        assert_eq!(counter().count(&banded_mask(1, 8, 0)), 1);
    }

    #[test]
    fn test_empty_mask_has_no_lines() {
        let analysis = counter().analyze(&GrayImage::new(40, 40));
        assert_eq!(analysis.line_count, 0);
        assert!(analysis.body.is_none());
    }

    #[test]
    fn test_body_keeps_the_skirt() {
        let profile = InkProfile::from_counts(vec![0, 0, 1, 2, 10, 10, 2, 1, 0, 0], 0);
        let body = counter().text_body(&profile.window_sums).unwrap();
        assert_eq!(body, 2..8);
    }

    #[test]
    fn test_plateau_inside_a_line_is_tolerated() {
        let profile = InkProfile::from_counts(vec![0, 2, 4, 6, 6, 6, 6, 4, 2, 0], 0);
        let analysis = LineCounter::new(LineConfig {
            smoothing_half_width: 0,
            derivative_half_width: 0,
            ..LineConfig::default()
        })
        .analyze_profile(&profile);
        assert_eq!(analysis.signs, "UUFFFDD");
        assert_eq!(analysis.line_count, 1);
        assert_eq!(analysis.unmatched_ratio, 0.0);
    }

    #[test]
    fn test_noise_dominated_profile_is_rejected() {
        // One genuine bump followed by a long stepped decay that no
        // rise-then-fall run explains.
        let mut counts = vec![0, 20, 40, 20];
        for level in (1..=12).rev() {
            counts.extend([level, level, level]);
        }
        let profile = InkProfile::from_counts(counts, 0);
        let analysis = LineCounter::new(LineConfig {
            smoothing_half_width: 0,
            derivative_half_width: 0,
            noise_fraction: 0.01,
            ..LineConfig::default()
        })
        .analyze_profile(&profile);
        assert!(analysis.matches >= 1);
        assert!(analysis.unmatched_ratio > 0.7, "{analysis:?}");
        assert_eq!(analysis.line_count, 0);
    }

    #[test]
    fn test_smoothed_is_average() {
        let profile = InkProfile::from_counts(vec![3, 3, 3], 1);
        assert_eq!(profile.smoothed(), vec![2.0, 3.0, 2.0]);
    }
}
