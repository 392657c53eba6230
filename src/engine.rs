//
// engine.rs
// Mri-Stats-rs
//
// Runs the full pipeline: resolve groups, extract voxels, reduce, and assemble the report.
//
// Thales Matheus Mendonça Santos - October 2026

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::config::StatsConfig;
use crate::error::Result;
use crate::lookup_table::LookupTable;
use crate::models::{Report, ReportInfo, StatRecord};
use crate::report;
use crate::resolver::{self, GroupSpec};
use crate::stats;
use crate::volume::{ensure_same_space, Segmentation, Volume};

const MM3_PER_ML: f64 = 1000.0;

/// Statistics for a single resolved group.
pub fn compute_group(
    spec: &GroupSpec,
    volume: &Volume,
    segmentation: &Segmentation,
    config: &StatsConfig,
) -> Result<StatRecord> {
    let sample = aggregate::extract(volume, segmentation, &spec.labels)?;
    if sample.nan_count > 0 {
        warn!(
            group = %spec.name,
            non_finite = sample.nan_count,
            "excluding non-finite intensities"
        );
    }
    debug!(group = %spec.name, voxels = sample.voxel_count, "extracted region");

    let summary = stats::compute(
        &sample.values,
        sample.voxel_count,
        sample.volume_mm3,
        config.percentile_levels(),
    );

    Ok(StatRecord {
        group_name: spec.name.clone(),
        kind: spec.kind,
        labels: spec.labels.iter().copied().collect(),
        voxel_count: summary.voxel_count,
        volume_mm3: summary.volume_mm3,
        volume_ml: summary.volume_mm3 / MM3_PER_ML,
        nan_count: sample.nan_count,
        sum: summary.sum,
        mean: summary.mean,
        median: summary.median,
        std: summary.std,
        min: summary.min,
        max: summary.max,
        percentiles: summary.percentiles,
    })
}

/// Compute a report over already resolved groups.
pub fn compute_report(
    specs: &[GroupSpec],
    volume: &Volume,
    segmentation: &Segmentation,
    config: &StatsConfig,
    info: ReportInfo,
) -> Result<Report> {
    ensure_same_space(volume, segmentation)?;

    let run = |(index, spec): (usize, &GroupSpec)| {
        compute_group(spec, volume, segmentation, config).map(|record| (index, record))
    };
    // Completion order is irrelevant: the assembler puts rows back by index.
    let records: Vec<(usize, StatRecord)> = if config.parallel() {
        specs.par_iter().enumerate().map(run).collect::<Result<_>>()?
    } else {
        specs.iter().enumerate().map(run).collect::<Result<_>>()?
    };

    report::assemble(specs, records, config.percentile_levels(), info)
}

/// Resolve `requested` against `table` and compute the report. An empty request
/// list falls back to [`resolver::default_requests`].
pub fn generate_report<S: AsRef<str>>(
    volume: &Volume,
    segmentation: &Segmentation,
    table: &LookupTable,
    requested: &[S],
    config: &StatsConfig,
) -> Result<Report> {
    let specs = if requested.is_empty() {
        let defaults = resolver::default_requests(table, segmentation);
        resolver::resolve_groups(&defaults, table)?
    } else {
        resolver::resolve_groups(requested, table)?
    };
    info!(
        groups = specs.len(),
        voxel_volume_mm3 = volume.voxel_volume(),
        parallel = config.parallel(),
        "computing region statistics"
    );

    compute_report(&specs, volume, segmentation, config, ReportInfo::default())
}
