//! # wisdom - layout analysis for scanned handwritten notes
//!
//! Answers four questions about each scan ("item of wisdom"): is it blank,
//! at what angle does its text run level, how many lines of text does it
//! hold, and is it a drawing rather than writing.
//!
//! ## Features
//!
//! - **Pure Rust**: pixel work on `image` buffers, no OpenCV
//! - **Lazy**: every answer is computed on first request and cached per item
//! - **Tunable**: every threshold lives in [`AnalysisConfig`], loadable from partial JSON
//! - **Pluggable**: the text-signature detector is a [`PatternPredicate`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wisdom::WisdomItem;
//!
//! let item = WisdomItem::open("scans/note-042.jpg")?;
//! if !item.is_blank()? {
//!     println!("level at {} degrees", item.best_angle()?);
//!     println!("{} lines", item.line_count()?);
//!     println!("drawing: {}", item.is_drawing()?);
//! }
//! # Ok::<(), wisdom::WisdomError>(())
//! ```

mod image_impl;

pub mod blank;
pub mod classify;
pub mod deskew;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod lines;
pub mod orientation;
pub mod preprocess;
pub mod types;
pub mod wisdom;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use crate::classify::{DrawingClassifier, PatternPredicate, PeakDensityPredicate, Region};
pub use crate::deskew::{DeskewOutcome, DeskewSearch};
pub use crate::diagnostics::DiagnosticSink;
pub use crate::error::WisdomError;
pub use crate::image_impl::Point2d;
pub use crate::orientation::{Accumulator, OrientationTransform};
pub use crate::types::AnalysisConfig;
pub use crate::wisdom::WisdomItem;

/// Read-only answers for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WisdomReport {
    pub filename: String,
    pub is_blank: bool,
    pub best_angle_degrees: u32,
    pub line_count: usize,
    pub is_drawing: bool,
}

/// Analyse one image file with the default configuration.
pub fn analyze<P: AsRef<Path>>(path: P) -> Result<WisdomReport, WisdomError> {
    WisdomItem::open(path)?.report()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_with_field_names() {
        let report = WisdomReport {
            filename: "a.png".to_string(),
            is_blank: false,
            best_angle_degrees: 12,
            line_count: 3,
            is_drawing: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["best_angle_degrees"], 12);
        assert_eq!(json["line_count"], 3);
    }

    #[test]
    fn test_analyze_missing_file() {
        assert!(matches!(
            analyze("/no/such/scan.png"),
            Err(WisdomError::NotFound(_))
        ));
    }
}
