//
// cli.rs
// Mri-Stats-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the statistics engine.
//
// Thales Matheus Mendonça Santos - October 2026

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{info, Level};

use crate::config::StatsConfig;
use crate::lookup_table::LookupTable;
use crate::metadata::{self, FilenamePattern, Timetable};
use crate::models::{Report, ReportInfo};
use crate::{engine, groups, json, report};

const FREESURFER_LUT_NAME: &str = "FreeSurferColorLUT.txt";

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "mri-stats")]
#[command(about = "Region statistics for segmented MRI volumes", long_about = None)]
pub struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute region statistics of one or more MRI volumes over a segmentation
    Compute {
        #[arg(short, long)]
        segmentation: PathBuf,
        #[arg(short, long, required = true, num_args = 1..)]
        mri: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        /// FreeSurfer colour lookup table (defaults to $FREESURFER_HOME/FreeSurferColorLUT.txt)
        #[arg(long)]
        lut: Option<PathBuf>,
        /// Region name, tag, or "all"; repeatable. Defaults to present regions plus built-in groups
        #[arg(short, long = "group")]
        groups: Vec<String>,
        #[arg(long, default_value = "25,50,75")]
        percentiles: String,
        /// JSON object with segmentation, mri_data, subject and session fields
        #[arg(short, long)]
        info: Option<String>,
        /// Named-group pattern for the segmentation file name (segmentation, subject)
        #[arg(long = "seg-regex", alias = "seg_regex")]
        seg_regex: Option<String>,
        /// Named-group pattern for MRI file names (mri_data, subject, session)
        #[arg(long = "mri-regex", alias = "mri_regex")]
        mri_regex: Option<String>,
        /// Tab-separated timetable with acquisition times relative to injection
        #[arg(short, long, requires = "timelabel")]
        timetable: Option<PathBuf>,
        /// Sequence label to look up in the timetable
        #[arg(short = 'l', long, requires = "timetable")]
        timelabel: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        #[arg(long, default_value_t = ';')]
        separator: char,
        /// Compute groups one after another instead of in parallel
        #[arg(long)]
        serial: bool,
    },
    /// Read one statistic for one region from a stats file (CSV, or JSON by extension)
    Get {
        #[arg(short = 'f', long)]
        stats_file: PathBuf,
        #[arg(short, long)]
        region: String,
        /// Statistic to retrieve (mean, std, PC25, voxelcount, timestamp, ...)
        #[arg(short, long)]
        info: String,
        #[arg(long, default_value_t = ';')]
        separator: char,
    },
    /// Print the built-in anatomical groups as JSON
    Groups,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Compute {
            segmentation,
            mri,
            output,
            lut,
            groups,
            percentiles,
            info,
            seg_regex,
            mri_regex,
            timetable,
            timelabel,
            format,
            separator,
            serial,
        } => {
            let config = StatsConfig::default()
                .with_percentiles(parse_percentiles(&percentiles)?)?
                .with_parallel(!serial);
            let base_info = parse_info(info.as_deref())?;
            let request = ComputeRequest {
                segmentation: &segmentation,
                mri: &mri,
                lut: lut.as_deref(),
                groups: &groups,
                config: &config,
                info: &base_info,
                metadata: MetadataOptions {
                    seg_pattern: seg_regex.as_deref(),
                    mri_pattern: mri_regex.as_deref(),
                    timetable: timetable.as_deref(),
                    timelabel: timelabel.as_deref(),
                },
            };
            let reports = compute_reports(&request)?;

            let rendered = match format {
                OutputFormat::Csv => report::to_csv(&reports, separator),
                OutputFormat::Json => json::reports_to_string(&reports)?,
            };
            fs::write(&output, rendered)
                .with_context(|| format!("Failed to write stats to {:?}", output))?;
            println!("Stats successfully saved to: {:?}", output);
        }
        Commands::Get {
            stats_file,
            region,
            info,
            separator,
        } => {
            let value = get_value(&stats_file, &region, &info, separator)?;
            match value {
                Some(v) => println!("{} for {} = {}", info, region, v),
                None => println!("{} for {} = undefined", info, region),
            }
        }
        Commands::Groups => {
            let listing: Vec<_> = groups::builtin_groups()
                .into_iter()
                .map(|(name, labels)| json!({ "name": name, "labels": labels }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }

    Ok(())
}

/// Inputs of one `compute` invocation.
pub struct ComputeRequest<'a> {
    pub segmentation: &'a Path,
    pub mri: &'a [PathBuf],
    pub lut: Option<&'a Path>,
    pub groups: &'a [String],
    pub config: &'a StatsConfig,
    pub info: &'a ReportInfo,
    pub metadata: MetadataOptions<'a>,
}

/// Where report metadata comes from beyond `--info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataOptions<'a> {
    pub seg_pattern: Option<&'a str>,
    pub mri_pattern: Option<&'a str>,
    pub timetable: Option<&'a Path>,
    pub timelabel: Option<&'a str>,
}

/// One report per MRI volume, all over the same segmentation. Any failure aborts
/// the whole run.
pub fn compute_reports(request: &ComputeRequest<'_>) -> anyhow::Result<Vec<Report>> {
    if !request.segmentation.exists() {
        bail!("Missing segmentation file: {:?}", request.segmentation);
    }
    // Validate every path before doing any work.
    if let Some(missing) = request.mri.iter().find(|p| !p.exists()) {
        bail!("Missing MRI file: {:?}", missing);
    }

    let infos = describe_inputs(request)?;
    let table = load_lookup_table(request.lut)?;
    let segmentation = json::read_segmentation(request.segmentation)?;

    let mut reports = Vec::with_capacity(request.mri.len());
    for (path, info) in request.mri.iter().zip(infos) {
        info!(mri = ?path, "processing MRI volume");
        let volume = json::read_volume(path)?;
        let mut report =
            engine::generate_report(&volume, &segmentation, &table, request.groups, request.config)
                .with_context(|| format!("Failed to process {:?}", path))?;
        report.info = info;
        reports.push(report);
    }
    Ok(reports)
}

/// Report metadata for every MRI path, resolved up front so that a file name
/// that does not match its pattern fails the run before any volume is read.
fn describe_inputs(request: &ComputeRequest<'_>) -> anyhow::Result<Vec<ReportInfo>> {
    let options = &request.metadata;
    let seg_pattern = options
        .seg_pattern
        .map(FilenamePattern::new)
        .transpose()
        .context("Invalid --seg-regex")?;
    let mri_pattern = options
        .mri_pattern
        .map(FilenamePattern::new)
        .transpose()
        .context("Invalid --mri-regex")?;
    let timetable = options
        .timetable
        .map(|path| {
            Timetable::from_path(path)
                .with_context(|| format!("Failed to read timetable {:?}", path))
        })
        .transpose()?;

    request
        .mri
        .iter()
        .map(|path| -> anyhow::Result<ReportInfo> {
            let mut info = metadata::describe(
                request.segmentation,
                path,
                seg_pattern.as_ref(),
                mri_pattern.as_ref(),
                request.info,
            )?;
            if let (Some(table), Some(label)) = (&timetable, options.timelabel) {
                info.timestamp = table.timestamp_for(label, &info);
            }
            Ok(info)
        })
        .collect()
}

/// First stored row for `region` answers the query. Files ending in `.json` are
/// read as JSON reports; anything else as delimited text split on `separator`.
pub fn get_value(
    stats_file: &Path,
    region: &str,
    statistic: &str,
    separator: char,
) -> anyhow::Result<Option<f64>> {
    if !stats_file.exists() {
        bail!("Stats file not found: {:?}", stats_file);
    }
    let is_json = stats_file
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let reports = json::read_reports(stats_file)?;
        let report = reports
            .iter()
            .find(|r| r.row(region).is_some())
            .ok_or_else(|| anyhow!("Region '{}' not found in the stats file", region))?;
        return Ok(report.value(region, statistic)?);
    }

    let text = fs::read_to_string(stats_file)
        .with_context(|| format!("Failed to read stats file {:?}", stats_file))?;
    Ok(report::csv_value(&text, separator, region, statistic)?)
}

/// Explicit path first, then `$FREESURFER_HOME`. Built-in groups are always added.
pub fn load_lookup_table(path: Option<&Path>) -> anyhow::Result<LookupTable> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let home = env::var_os("FREESURFER_HOME").ok_or_else(|| {
                anyhow!("No lookup table given: pass --lut or set FREESURFER_HOME")
            })?;
            PathBuf::from(home).join(FREESURFER_LUT_NAME)
        }
    };
    let table = LookupTable::from_path(&path)
        .with_context(|| format!("Failed to read lookup table {:?}", path))?;
    info!(entries = table.len(), lut = ?path, "loaded lookup table");
    Ok(table.with_builtin_groups())
}

fn parse_percentiles(text: &str) -> anyhow::Result<Vec<f64>> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .with_context(|| format!("Invalid percentile level '{}'", t))
        })
        .collect()
}

fn parse_info(info: Option<&str>) -> anyhow::Result<ReportInfo> {
    match info {
        Some(text) => serde_json::from_str(text).context("--info must be a valid JSON string"),
        None => Ok(ReportInfo::default()),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_lists_parse() {
        assert_eq!(parse_percentiles("1, 5,25 ,99").unwrap(), vec![1.0, 5.0, 25.0, 99.0]);
        assert!(parse_percentiles("10,abc").is_err());
    }

    #[test]
    fn info_json_fills_known_fields() {
        let info = parse_info(Some(r#"{"subject": "sub-01", "session": "ses-02"}"#)).unwrap();
        assert_eq!(info.subject.as_deref(), Some("sub-01"));
        assert_eq!(info.session.as_deref(), Some("ses-02"));
        assert!(info.segmentation.is_none());
        assert!(parse_info(Some("not json")).is_err());
    }

    #[test]
    fn timetable_and_timelabel_go_together() {
        let base = ["mri-stats", "compute", "-s", "seg.json", "-m", "a.json", "-o", "out.csv"];
        let with = |extra: &[&str]| {
            Cli::try_parse_from(base.iter().chain(extra.iter()).copied()).map(|_| ())
        };
        assert!(with(&[]).is_ok());
        assert!(with(&["--timetable", "times.tsv"]).is_err());
        assert!(with(&["--timelabel", "mixed"]).is_err());
        assert!(with(&["-t", "times.tsv", "-l", "mixed", "--seg_regex", "(?P<subject>sub-\\d+)"]).is_ok());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
