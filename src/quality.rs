//! Quality scoring for collected records
//!
//! A simple weighted average over the four sub-scores of [`SourceMeta`],
//! classified into bands by two thresholds.

use crate::models::SourceMeta;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SOURCE_WEIGHT: f64 = 0.35;
pub const RECENCY_WEIGHT: f64 = 0.25;
pub const STRUCTURE_WEIGHT: f64 = 0.2;
pub const CONSISTENCY_WEIGHT: f64 = 0.2;

pub const DEFAULT_MAIN_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MINIMUM_QUALITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualityBand {
    Main,
    Support,
    Discard,
}

impl QualityBand {
    /// `Main` at or above `main_threshold`, `Support` at or above
    /// `minimum_quality`, `Discard` below both
    pub fn classify(score: f64, main_threshold: f64, minimum_quality: f64) -> Self {
        if score >= main_threshold {
            QualityBand::Main
        } else if score >= minimum_quality {
            QualityBand::Support
        } else {
            QualityBand::Discard
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityBand::Main => "main",
            QualityBand::Support => "support",
            QualityBand::Discard => "discard",
        };
        write!(f, "{}", s)
    }
}

impl SourceMeta {
    /// Weighted composite of the sub-scores, rounded to 3 decimals
    pub fn quality_score(&self) -> f64 {
        let total = self.source_score * SOURCE_WEIGHT
            + self.recency_score * RECENCY_WEIGHT
            + self.structure_score * STRUCTURE_WEIGHT
            + self.consistency_score * CONSISTENCY_WEIGHT;
        (total * 1000.0).round() / 1000.0
    }

    pub fn quality_band(&self, main_threshold: f64, minimum_quality: f64) -> QualityBand {
        QualityBand::classify(self.quality_score(), main_threshold, minimum_quality)
    }
}
