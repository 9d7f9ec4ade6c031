//! Tuning parameters for every stage of the analysis.
//!
//! The defaults were found by trial and error against a hand-labeled sample
//! of roughly one hundred scans. They are configuration, not constants: load
//! a partial JSON file with [`AnalysisConfig::from_json_file`] to retune.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WisdomError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Downscale factor applied to both dimensions.
    pub scale: f32,
    /// Luma at or below this value is ink.
    pub ink_threshold: u8,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            scale: 0.1,
            ink_threshold: 230,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Added to every requested rotation so that no sample is an exact 0°
    /// rotation, which the bilinear warp renders brighter than any other.
    pub angle_bias: f64,
    /// Rotated values above this are ink again.
    pub rethreshold: u8,
    /// Width of the flat horizontal structuring element, in working pixels.
    /// 85 levels 94% of the textual samples.
    pub levelling_width: u32,
    /// Sampling step of the first search round, in degrees.
    pub initial_step: u32,
    /// The search stops once the step is at or below this many degrees.
    pub angle_resolution: u32,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            angle_bias: 1.0,
            rethreshold: 20,
            levelling_width: 85,
            initial_step: 30,
            angle_resolution: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankConfig {
    /// At or below this many ink pixels the item is blank.
    pub minimum_ink: u64,
}

impl Default for BlankConfig {
    fn default() -> Self {
        Self { minimum_ink: 100 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub smoothing_half_width: usize,
    /// Fraction of the smoothed peak below which a row is noise.
    pub noise_fraction: f64,
    pub derivative_half_width: usize,
    /// Above this share of unmatched sign samples the count is rejected.
    pub max_unmatched_ratio: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            smoothing_half_width: 5,
            noise_fraction: 0.25,
            derivative_half_width: 1,
            max_unmatched_ratio: 0.7,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Vote around the ink centroid instead of the geometric center.
    pub center_on_centroid: bool,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            center_on_centroid: true,
        }
    }
}

/// Parameters of the built-in peak-density text detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Normalized cells at or above `peak_fraction * 255` are peaks.
    pub peak_fraction: f64,
    /// Half-width, in degrees, of the band around horizontal-line orientation.
    pub axis_band_degrees: u32,
    /// Minimum share of peaks that must fall inside the axis bands.
    pub min_axis_share: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            peak_fraction: 0.6,
            axis_band_degrees: 10,
            min_axis_share: 0.5,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub prepare: PrepareConfig,
    pub deskew: DeskewConfig,
    pub blank: BlankConfig,
    pub lines: LineConfig,
    pub orientation: OrientationConfig,
    pub peaks: PeakConfig,
}

impl AnalysisConfig {
    /// Load a (possibly partial) configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, WisdomError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: AnalysisConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WisdomError> {
        let scale = self.prepare.scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(WisdomError::Config(format!(
                "prepare.scale must be in (0, 1], got {scale}"
            )));
        }
        if self.deskew.levelling_width == 0 {
            return Err(WisdomError::Config(
                "deskew.levelling_width must be positive".to_string(),
            ));
        }
        if self.deskew.angle_resolution == 0 || self.deskew.initial_step == 0 {
            return Err(WisdomError::Config(
                "deskew.initial_step and deskew.angle_resolution must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("lines.noise_fraction", self.lines.noise_fraction),
            ("lines.max_unmatched_ratio", self.lines.max_unmatched_ratio),
            ("peaks.peak_fraction", self.peaks.peak_fraction),
            ("peaks.min_axis_share", self.peaks.min_axis_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WisdomError::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.peaks.axis_band_degrees >= 90 {
            return Err(WisdomError::Config(
                "peaks.axis_band_degrees must be below 90".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "deskew": { "levelling_width": 60 } }"#).unwrap();
        assert_eq!(config.deskew.levelling_width, 60);
        assert_eq!(config.deskew.angle_resolution, 5);
        assert_eq!(config.prepare.ink_threshold, 230);
        assert_eq!(config.blank.minimum_ink, 100);
    }

    #[test]
    fn rejects_out_of_range_scale() {
        let mut config = AnalysisConfig::default();
        config.prepare.scale = 0.0;
        assert!(matches!(config.validate(), Err(WisdomError::Config(_))));
        config.prepare.scale = 1.5;
        assert!(matches!(config.validate(), Err(WisdomError::Config(_))));
    }

    #[test]
    fn rejects_ratio_above_one() {
        let mut config = AnalysisConfig::default();
        config.lines.max_unmatched_ratio = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "blank": { "minimum_ink": 42 } }"#).unwrap();
        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.blank.minimum_ink, 42);
    }
}
