//
// metadata.rs
// Mri-Stats-rs
//
// Fills report metadata from input file names and looks up acquisition times in a timetable.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, StatsError};
use crate::models::ReportInfo;

/// Named-group pattern matched from the start of a file name, e.g.
/// `(?P<subject>sub-\d{2})_(?P<session>ses-\d{2})_(?P<mri_data>[^.]+)`.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    regex: Regex,
}

impl FilenamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self { regex })
    }

    /// Named groups that took part in the match. A file name that does not match
    /// is an error.
    pub fn captures(&self, path: &Path) -> Result<HashMap<String, String>> {
        let name = file_name(path).unwrap_or_default();
        let caps = self
            .regex
            .captures(&name)
            .ok_or_else(|| StatsError::PatternMismatch { file: name.clone() })?;
        Ok(self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|group| {
                caps.name(group)
                    .map(|m| (group.to_string(), m.as_str().to_string()))
            })
            .collect())
    }
}

/// Metadata of the report for `mri` over `segmentation`.
///
/// Each field is taken from the first source that has it: a filename pattern,
/// then `base`, then the bare file name for `segmentation` and `mri_data`. A
/// subject captured from the MRI name overrides one captured from the
/// segmentation name.
pub fn describe(
    segmentation: &Path,
    mri: &Path,
    segmentation_pattern: Option<&FilenamePattern>,
    mri_pattern: Option<&FilenamePattern>,
    base: &ReportInfo,
) -> Result<ReportInfo> {
    let seg_fields = segmentation_pattern
        .map(|p| p.captures(segmentation))
        .transpose()?
        .unwrap_or_default();
    let mri_fields = mri_pattern
        .map(|p| p.captures(mri))
        .transpose()?
        .unwrap_or_default();

    Ok(ReportInfo {
        segmentation: seg_fields
            .get("segmentation")
            .cloned()
            .or_else(|| base.segmentation.clone())
            .or_else(|| file_name(segmentation)),
        mri_data: mri_fields
            .get("mri_data")
            .cloned()
            .or_else(|| base.mri_data.clone())
            .or_else(|| file_name(mri)),
        subject: mri_fields
            .get("subject")
            .or_else(|| seg_fields.get("subject"))
            .cloned()
            .or_else(|| base.subject.clone()),
        session: mri_fields
            .get("session")
            .cloned()
            .or_else(|| base.session.clone()),
        timestamp: base.timestamp,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct TimetableRow {
    sequence_label: String,
    subject: String,
    session: String,
    acquisition_relative_injection: Option<f64>,
}

/// Tab-separated table of acquisition times relative to injection, one row per
/// sequence, subject and session. Other columns are ignored.
#[derive(Debug, Clone, Default)]
pub struct Timetable {
    rows: Vec<TimetableRow>,
}

impl Timetable {
    pub fn parse(reader: impl Read) -> Result<Self> {
        let rows = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(reader)
            .deserialize()
            .collect::<std::result::Result<Vec<TimetableRow>, _>>()?;
        debug!(rows = rows.len(), "parsed timetable");
        Ok(Self { rows })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::parse(File::open(path)?)
    }

    /// Time of the single row matching all three keys. The sequence label is
    /// compared case-insensitively.
    pub fn lookup(&self, sequence: &str, subject: &str, session: &str) -> Result<f64> {
        let sequence_lower = sequence.to_lowercase();
        let times: Vec<f64> = self
            .rows
            .iter()
            .filter(|row| {
                row.sequence_label.to_lowercase() == sequence_lower
                    && row.subject == subject
                    && row.session == session
            })
            .filter_map(|row| row.acquisition_relative_injection)
            .collect();

        match times.as_slice() {
            [time] => Ok(*time),
            _ => Err(StatsError::TimestampNotFound {
                sequence: sequence.to_string(),
                subject: subject.to_string(),
                session: session.to_string(),
                matches: times.len(),
            }),
        }
    }

    /// Like [`Timetable::lookup`] for the subject and session of `info`, but any
    /// failure leaves the timestamp undefined.
    pub fn timestamp_for(&self, sequence: &str, info: &ReportInfo) -> Option<f64> {
        let (subject, session) = match (&info.subject, &info.session) {
            (Some(subject), Some(session)) => (subject, session),
            _ => {
                warn!("timestamp needs both subject and session; leaving it undefined");
                return None;
            }
        };
        match self.lookup(sequence, subject, session) {
            Ok(time) => Some(time),
            Err(err) => {
                warn!(error = %err, "timestamp lookup failed");
                None
            }
        }
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
