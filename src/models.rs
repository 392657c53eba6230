//
// models.rs
// Mri-Stats-rs
//
// Serializable records produced by the engine: per-group statistics, report metadata, and the report itself.
//
// Thales Matheus Mendonça Santos - October 2026

use serde::{Deserialize, Serialize};

use crate::resolver::GroupKind;

/// Value of one requested percentile level. `value` is `None` for empty samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    pub level: f64,
    pub value: Option<f64>,
}

/// Reduced statistics of a voxel sample. Every `Option` is `None` exactly when no
/// finite voxel was sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStatistics {
    pub voxel_count: usize,
    pub volume_mm3: f64,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Population standard deviation (denominator n).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub percentiles: Vec<Percentile>,
}

/// One report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub group_name: String,
    pub kind: GroupKind,
    pub labels: Vec<u32>,
    pub voxel_count: usize,
    pub volume_mm3: f64,
    pub volume_ml: f64,
    pub nan_count: usize,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub percentiles: Vec<Percentile>,
}

impl StatRecord {
    /// Value at a computed percentile level, `None` if the level was not requested
    /// or the sample was empty.
    pub fn percentile(&self, level: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|p| p.level == level)
            .and_then(|p| p.value)
    }
}

/// Descriptive fields carried alongside the rows, e.g. for export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub segmentation: Option<String>,
    pub mri_data: Option<String>,
    pub subject: Option<String>,
    pub session: Option<String>,
    /// Acquisition time relative to injection, from a timetable.
    pub timestamp: Option<f64>,
}

/// Rows in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub info: ReportInfo,
    pub percentile_levels: Vec<f64>,
    pub rows: Vec<StatRecord>,
}
