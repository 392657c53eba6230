//
// report.rs
// Mri-Stats-rs
//
// Merges per-group records back into request order and renders reports as delimited text.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fmt::Write;

use crate::error::{Result, StatsError};
use crate::models::{Report, ReportInfo, StatRecord};
use crate::resolver::GroupSpec;

/// Merge records computed in any order into a report following `specs`.
///
/// Each record is tagged with the index of its group in `specs`. A group with no
/// record fails the whole report; no partial reports are produced.
pub fn assemble(
    specs: &[GroupSpec],
    records: impl IntoIterator<Item = (usize, StatRecord)>,
    percentile_levels: &[f64],
    info: ReportInfo,
) -> Result<Report> {
    let mut slots: Vec<Option<StatRecord>> = vec![None; specs.len()];
    for (index, record) in records {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(record);
        }
    }

    let rows = specs
        .iter()
        .zip(slots)
        .map(|(spec, slot)| {
            slot.filter(|record| record.group_name == spec.name)
                .ok_or_else(|| StatsError::IncompleteReport {
                    group: spec.name.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Report {
        info,
        percentile_levels: percentile_levels.to_vec(),
        rows,
    })
}

/// Column name of a percentile level, e.g. `PC25` or `PC2.5`.
pub fn percentile_column(level: f64) -> String {
    format!("PC{}", level)
}

impl Report {
    pub fn row(&self, group_name: &str) -> Option<&StatRecord> {
        self.rows.iter().find(|r| r.group_name == group_name)
    }

    /// Look up one statistic of one row by its export column name.
    pub fn value(&self, region: &str, statistic: &str) -> Result<Option<f64>> {
        let record = self
            .row(region)
            .ok_or_else(|| StatsError::RegionNotInReport {
                region: region.to_string(),
            })?;

        let value = match statistic {
            "timestamp" => self.info.timestamp,
            "voxelcount" => Some(record.voxel_count as f64),
            "volume_mm3" => Some(record.volume_mm3),
            "volume_ml" => Some(record.volume_ml),
            "num_nan_values" => Some(record.nan_count as f64),
            "sum" => record.sum,
            "mean" => record.mean,
            "median" => record.median,
            "std" => record.std,
            "min" => record.min,
            "max" => record.max,
            other => {
                let level = other
                    .strip_prefix("PC")
                    .and_then(|l| l.parse::<f64>().ok())
                    .filter(|l| self.percentile_levels.contains(l))
                    .ok_or_else(|| StatsError::UnknownStatistic {
                        name: other.to_string(),
                    })?;
                record.percentile(level)
            }
        };
        Ok(value)
    }
}

/// Render reports as delimited text under a single header. Undefined values are
/// written as empty cells. Percentile columns follow the first report.
pub fn to_csv(reports: &[Report], separator: char) -> String {
    let levels: &[f64] = reports
        .first()
        .map(|r| r.percentile_levels.as_slice())
        .unwrap_or(&[]);

    let mut header: Vec<String> = [
        "segmentation",
        "mri_data",
        "subject",
        "session",
        "timestamp",
        "label",
        "description",
        "voxelcount",
        "volume_mm3",
        "volume_ml",
        "num_nan_values",
        "sum",
        "mean",
        "median",
        "std",
        "min",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(levels.iter().map(|&l| percentile_column(l)));
    header.push("max".to_string());

    let sep = separator.to_string();
    let mut out = String::new();
    let _ = writeln!(out, "{}", header.join(&sep));

    for report in reports {
        for record in &report.rows {
            let labels = record
                .labels
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let mut cells = vec![
                opt_text(&report.info.segmentation),
                opt_text(&report.info.mri_data),
                opt_text(&report.info.subject),
                opt_text(&report.info.session),
                opt_number(report.info.timestamp),
                labels,
                record.group_name.clone(),
                record.voxel_count.to_string(),
                record.volume_mm3.to_string(),
                record.volume_ml.to_string(),
                record.nan_count.to_string(),
                opt_number(record.sum),
                opt_number(record.mean),
                opt_number(record.median),
                opt_number(record.std),
                opt_number(record.min),
            ];
            cells.extend(levels.iter().map(|&l| opt_number(record.percentile(l))));
            cells.push(opt_number(record.max));

            let line = cells
                .iter()
                .map(|c| escape_cell(c, separator))
                .collect::<Vec<_>>()
                .join(&sep);
            let _ = writeln!(out, "{}", line);
        }
    }
    out
}

/// Read one statistic of one region back from text written by [`to_csv`].
///
/// Rows are matched on the `description` column and the first match answers.
/// An empty cell is an undefined value.
pub fn csv_value(text: &str, separator: char, region: &str, statistic: &str) -> Result<Option<f64>> {
    let delimiter = u8::try_from(separator)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(StatsError::InvalidSeparator { separator })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let description = position("description").ok_or_else(|| StatsError::MissingColumn {
        column: "description".to_string(),
    })?;
    let column = position(statistic)
        .filter(|_| is_numeric_column(statistic))
        .ok_or_else(|| StatsError::UnknownStatistic {
            name: statistic.to_string(),
        })?;

    for record in reader.records() {
        let record = record?;
        if record.get(description) != Some(region) {
            continue;
        }
        let cell = record.get(column).unwrap_or_default();
        if cell.is_empty() {
            return Ok(None);
        }
        return cell.parse().map(Some).map_err(|_| StatsError::InvalidCell {
            column: statistic.to_string(),
            value: cell.to_string(),
        });
    }

    Err(StatsError::RegionNotInReport {
        region: region.to_string(),
    })
}

fn is_numeric_column(name: &str) -> bool {
    const NUMERIC: [&str; 11] = [
        "timestamp",
        "voxelcount",
        "volume_mm3",
        "volume_ml",
        "num_nan_values",
        "sum",
        "mean",
        "median",
        "std",
        "min",
        "max",
    ];
    NUMERIC.contains(&name)
        || name
            .strip_prefix("PC")
            .map_or(false, |level| level.parse::<f64>().is_ok())
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn escape_cell(cell: &str, separator: char) -> String {
    if cell.contains(separator) || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
