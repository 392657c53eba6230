//
// error.rs
// Mri-Stats-rs
//
// Error taxonomy shared by every stage of the region statistics engine.
//
// Thales Matheus Mendonça Santos - October 2026

use thiserror::Error;

use crate::volume::Shape;

/// Failures surfaced by the engine. All of them are deterministic input problems,
/// so nothing here is retried.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Duplicate label {label} in lookup table")]
    DuplicateLabel { label: u32 },

    #[error("Unknown group '{group}': not a region name, tag, or aggregate")]
    UnknownGroup { group: String },

    #[error("Shape mismatch: volume {volume:?} vs segmentation {segmentation:?}")]
    ShapeMismatch { volume: Shape, segmentation: Shape },

    #[error(
        "Volume and segmentation are not in the same space (max relative affine error {max_relative_error:.3e})"
    )]
    AffineMismatch {
        volume: [[f64; 4]; 4],
        segmentation: [[f64; 4]; 4],
        max_relative_error: f64,
    },

    #[error("Percentile level {level} is outside [0, 100]")]
    InvalidPercentile { level: f64 },

    #[error("Data length {actual} does not match shape with {expected} voxels")]
    InvalidShape { expected: usize, actual: usize },

    #[error("Malformed lookup table line {line}: {reason}")]
    LutParse { line: usize, reason: String },

    #[error("Unknown statistic '{name}'")]
    UnknownStatistic { name: String },

    #[error("Region '{region}' not found in report")]
    RegionNotInReport { region: String },

    #[error("No statistics were produced for group '{group}'")]
    IncompleteReport { group: String },

    #[error("Stats file has no '{column}' column")]
    MissingColumn { column: String },

    #[error("Column '{column}' holds non-numeric value '{value}'")]
    InvalidCell { column: String, value: String },

    #[error("Separator {separator:?} must be a single ASCII character")]
    InvalidSeparator { separator: char },

    #[error("Invalid file name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("File name '{file}' does not match the provided pattern")]
    PatternMismatch { file: String },

    #[error("Timetable has {matches} rows for sequence '{sequence}', {subject}, {session}; expected one")]
    TimestampNotFound {
        sequence: String,
        subject: String,
        session: String,
        matches: usize,
    },

    #[error("Malformed delimited file: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatsError>;
