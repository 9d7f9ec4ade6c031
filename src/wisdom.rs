//! The per-image aggregate.
//!
//! A [`WisdomItem`] answers four questions about one scan: is it blank, at
//! what angle is its text level, how many lines does it hold, and is it a
//! drawing. The scan is decoded when the item is built; each answer and
//! each intermediate it rests on is computed on first request and cached
//! for the lifetime of the item.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use tracing::{debug, info, instrument};

use crate::blank::BlankDetector;
use crate::classify::{DrawingClassifier, PatternPredicate};
use crate::deskew::DeskewSearch;
use crate::diagnostics::DiagnosticSink;
use crate::error::WisdomError;
use crate::image_impl;
use crate::lines::{InkProfile, LineAnalysis, LineCounter};
use crate::orientation::OrientationTransform;
use crate::preprocess::MaskPreparer;
use crate::types::AnalysisConfig;
use crate::WisdomReport;

pub struct WisdomItem {
    filepath: PathBuf,
    config: AnalysisConfig,
    classifier: DrawingClassifier,
    diagnostics: Option<DiagnosticSink>,

    source: DynamicImage,
    prepared: OnceCell<GrayImage>,
    is_blank: OnceCell<bool>,
    best_angle: OnceCell<u32>,
    prepared_rotated: OnceCell<GrayImage>,
    lines: OnceCell<LineAnalysis>,
    is_drawing: OnceCell<bool>,
}

/// Return the cached value, or compute, cache and return it.
fn cached<'a, T>(
    cell: &'a OnceCell<T>,
    compute: impl FnOnce() -> Result<T, WisdomError>,
) -> Result<&'a T, WisdomError> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = compute()?;
    Ok(cell.get_or_init(|| value))
}

impl WisdomItem {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WisdomError> {
        Self::open_with(path, AnalysisConfig::default())
    }

    /// Fails with [`WisdomError::NotFound`] unless `path` is a regular file,
    /// and with [`WisdomError::Decode`] if it does not hold a readable image.
    pub fn open_with<P: AsRef<Path>>(path: P, config: AnalysisConfig) -> Result<Self, WisdomError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(WisdomError::NotFound(path.to_path_buf()));
        }
        config.validate()?;
        let image = image_impl::imread(path).map_err(|source| WisdomError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::build(path.to_path_buf(), image, config))
    }

    /// Wrap an already decoded image. `path` only provides the identity.
    pub fn from_image<P: AsRef<Path>>(
        path: P,
        image: DynamicImage,
        config: AnalysisConfig,
    ) -> Result<Self, WisdomError> {
        config.validate()?;
        Ok(Self::build(path.as_ref().to_path_buf(), image, config))
    }

    fn build(filepath: PathBuf, source: DynamicImage, config: AnalysisConfig) -> Self {
        let classifier = DrawingClassifier::with_peak_density(
            OrientationTransform::new(config.orientation.center_on_centroid),
            config.peaks.clone(),
        );
        Self {
            filepath,
            config,
            classifier,
            diagnostics: None,
            source,
            prepared: OnceCell::new(),
            is_blank: OnceCell::new(),
            best_angle: OnceCell::new(),
            prepared_rotated: OnceCell::new(),
            lines: OnceCell::new(),
            is_drawing: OnceCell::new(),
        }
    }

    /// Replace the built-in peak-density detector with another predicate.
    pub fn with_predicate<P: PatternPredicate + 'static>(mut self, predicate: P) -> Self {
        self.classifier = DrawingClassifier::new(self.classifier.transform, Box::new(predicate));
        self
    }

    pub fn with_diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn filename(&self) -> String {
        self.filepath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn diagnostic_key(&self) -> String {
        self.filepath
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "item".to_string())
    }

    pub fn source(&self) -> &DynamicImage {
        &self.source
    }

    pub fn prepared(&self) -> Result<&GrayImage, WisdomError> {
        cached(&self.prepared, || {
            let mask = MaskPreparer::from_config(&self.config.prepare).run(&self.source);
            if let Some(sink) = &self.diagnostics {
                sink.prepared(&self.diagnostic_key(), &mask);
            }
            Ok(mask)
        })
    }

    pub fn is_blank(&self) -> Result<bool, WisdomError> {
        cached(&self.is_blank, || {
            let detector = BlankDetector::new(self.config.blank.minimum_ink);
            Ok(detector.is_blank(self.prepared()?))
        })
        .copied()
    }

    /// Degrees in `[0, 180)` that level the text. Blank items are level.
    pub fn best_angle(&self) -> Result<u32, WisdomError> {
        cached(&self.best_angle, || {
            if self.is_blank()? {
                return Ok(0);
            }
            let outcome = self.deskew_search().search(self.prepared()?)?;
            Ok(outcome.best_angle)
        })
        .copied()
    }

    /// The prepared mask rotated by the best angle and re-thresholded.
    pub fn prepared_rotated(&self) -> Result<&GrayImage, WisdomError> {
        cached(&self.prepared_rotated, || {
            let levelled = self.deskew_search().level(self.prepared()?, self.best_angle()?)?;
            if let Some(sink) = &self.diagnostics {
                sink.rotated(&self.diagnostic_key(), &levelled);
            }
            Ok(levelled)
        })
    }

    pub fn line_analysis(&self) -> Result<&LineAnalysis, WisdomError> {
        cached(&self.lines, || {
            let counter = LineCounter::new(self.config.lines.clone());
            if self.is_blank()? {
                debug!("blank item has no lines");
                return Ok(counter.analyze_profile(&InkProfile::from_counts(Vec::new(), 0)));
            }
            let levelled = self.prepared_rotated()?;
            let profile = InkProfile::from_mask(levelled, counter.cfg.smoothing_half_width);
            let analysis = counter.analyze_profile(&profile);
            if let Some(sink) = &self.diagnostics {
                sink.profile(&self.diagnostic_key(), levelled, &profile, &analysis);
            }
            Ok(analysis)
        })
    }

    pub fn line_count(&self) -> Result<usize, WisdomError> {
        Ok(self.line_analysis()?.line_count)
    }

    /// The accumulator behind this answer is not kept.
    pub fn is_drawing(&self) -> Result<bool, WisdomError> {
        cached(&self.is_drawing, || {
            if self.is_blank()? {
                return Ok(false);
            }
            let classification = self.classifier.classify(self.prepared_rotated()?);
            if let Some(sink) = &self.diagnostics {
                sink.accumulator(&self.diagnostic_key(), &classification.accumulator);
            }
            Ok(classification.is_drawing)
        })
        .copied()
    }

    #[instrument(skip_all, fields(file = %self.filepath.display()))]
    pub fn report(&self) -> Result<WisdomReport, WisdomError> {
        let report = WisdomReport {
            filename: self.filename(),
            is_blank: self.is_blank()?,
            best_angle_degrees: self.best_angle()?,
            line_count: self.line_count()?,
            is_drawing: self.is_drawing()?,
        };
        info!(
            is_blank = report.is_blank,
            best_angle = report.best_angle_degrees,
            lines = report.line_count,
            is_drawing = report.is_drawing,
            "analysed item"
        );
        Ok(report)
    }

    fn deskew_search(&self) -> DeskewSearch {
        DeskewSearch::from_config(&self.config.deskew)
    }
}
