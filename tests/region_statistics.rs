//
// region_statistics.rs
// Mri-Stats-rs
//
// Integration-style tests covering group resolution, empty masks, ordering, determinism, export, and the file-based workflow.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::BTreeSet;
use std::path::PathBuf;

use mri_stats::cli::{compute_reports, get_value, ComputeRequest, MetadataOptions};
use mri_stats::json::{self, VolumeDocument};
use mri_stats::models::ReportInfo;
use mri_stats::{
    generate_report, report, Affine, LookupTable, Segmentation, StatsConfig, StatsError, Volume,
};
use ndarray::Array3;
use proptest::prelude::*;
use tempfile::{tempdir, TempDir};

const GRID: usize = 10;

fn label_table() -> LookupTable {
    LookupTable::from_definition(&[
        (1, "label-1", &["left-hemisphere", "cortex"]),
        (2, "label-2", &["right-hemisphere", "cortex"]),
        (3, "label-3", &["right-hemisphere"]),
    ])
    .expect("table")
}

/// Constant 10.0 everywhere; label 1 in the (0:5, 0:5, 0:5) corner, label 2 elsewhere.
fn constant_scenario() -> (Volume, Segmentation) {
    let volume = Volume::new(Array3::from_elem((GRID, GRID, GRID), 10.0), Affine::identity());
    let labels = Array3::from_shape_fn((GRID, GRID, GRID), |(x, y, z)| {
        if x < 5 && y < 5 && z < 5 {
            1
        } else {
            2
        }
    });
    (volume, Segmentation::new(labels, Affine::identity()))
}

/// Intensities that vary per voxel so that statistics are sensitive to ordering.
fn ramp_scenario() -> (Volume, Segmentation) {
    let affine = Affine::from_spacing([0.5, 0.5, 1.0]);
    let volume = Volume::new(
        Array3::from_shape_fn((GRID, GRID, GRID), |(x, y, z)| (x * 100 + y * 10 + z) as f32 * 0.1),
        affine,
    );
    let labels = Array3::from_shape_fn((GRID, GRID, GRID), |(x, y, _)| ((x + y) % 3) as u32);
    (volume, Segmentation::new(labels, affine))
}

#[test]
fn constant_volume_two_labels() {
    let (volume, seg) = constant_scenario();
    let report = generate_report(
        &volume,
        &seg,
        &label_table(),
        &["label-1", "label-2"],
        &StatsConfig::default(),
    )
    .expect("report");

    assert_eq!(report.rows.len(), 2);
    let first = &report.rows[0];
    assert_eq!(first.group_name, "label-1");
    assert_eq!(first.voxel_count, 125);
    assert_eq!(first.volume_mm3, 125.0);
    assert_eq!(first.mean, Some(10.0));
    assert_eq!(first.median, Some(10.0));
    assert_eq!(first.std, Some(0.0));

    let second = &report.rows[1];
    assert_eq!(second.group_name, "label-2");
    assert_eq!(second.voxel_count, GRID * GRID * GRID - 125);
    assert_eq!(second.volume_mm3, (GRID * GRID * GRID - 125) as f64);
    assert_eq!(second.mean, Some(10.0));
    assert_eq!(second.median, Some(10.0));
    assert_eq!(second.std, Some(0.0));
    assert_eq!(second.percentile(75.0), Some(10.0));
}

#[test]
fn repeated_runs_are_bit_identical() {
    let (volume, seg) = ramp_scenario();
    let requests = ["cortex", "label-3", "all", "right-hemisphere", "label-1"];
    let config = StatsConfig::default()
        .with_percentiles([1.0, 5.0, 25.0, 75.0, 90.0, 95.0, 99.0])
        .expect("levels");

    let first = generate_report(&volume, &seg, &label_table(), &requests, &config).expect("first");
    let second = generate_report(&volume, &seg, &label_table(), &requests, &config).expect("second");
    assert_eq!(first, second);

    for (a, b) in first.rows.iter().zip(&second.rows) {
        assert_eq!(a.mean.map(f64::to_bits), b.mean.map(f64::to_bits));
        assert_eq!(a.std.map(f64::to_bits), b.std.map(f64::to_bits));
    }
}

#[test]
fn rows_follow_every_request_permutation() {
    let (volume, seg) = ramp_scenario();
    let names = ["label-1", "label-2", "cortex", "all"];
    let permutations = [
        [0, 1, 2, 3],
        [3, 2, 1, 0],
        [2, 0, 3, 1],
        [1, 3, 0, 2],
    ];
    for order in permutations {
        let requested: Vec<&str> = order.iter().map(|&i| names[i]).collect();
        let report =
            generate_report(&volume, &seg, &label_table(), &requested, &StatsConfig::default())
                .expect("report");
        let rows: Vec<&str> = report.rows.iter().map(|r| r.group_name.as_str()).collect();
        assert_eq!(rows, requested);
    }
}

#[test]
fn empty_masks_report_undefined_statistics() {
    let (volume, seg) = constant_scenario();
    let report = generate_report(
        &volume,
        &seg,
        &label_table(),
        &["label-3", "unknown-42"],
        &StatsConfig::default(),
    )
    .expect("report");

    for row in &report.rows {
        assert_eq!(row.voxel_count, 0);
        assert_eq!(row.volume_mm3, 0.0);
        assert!(row.mean.is_none());
        assert!(row.median.is_none());
        assert!(row.std.is_none());
        assert!(row.percentiles.iter().all(|p| p.value.is_none()));
    }
}

#[test]
fn unknown_group_produces_no_report() {
    let (volume, seg) = constant_scenario();
    let result = generate_report(
        &volume,
        &seg,
        &label_table(),
        &["label-1", "cerebellum", "label-2"],
        &StatsConfig::default(),
    );
    match result {
        Err(StatsError::UnknownGroup { group }) => assert_eq!(group, "cerebellum"),
        other => panic!("expected UnknownGroup, got {:?}", other.map(|r| r.rows.len())),
    }
}

#[test]
fn mismatched_grids_are_rejected_with_both_shapes() {
    let (volume, _) = constant_scenario();
    let seg = Segmentation::new(Array3::ones((GRID, GRID, GRID - 1)), Affine::identity());
    let err = generate_report(&volume, &seg, &label_table(), &["label-1"], &StatsConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("[10, 10, 10]"));
    assert!(err.to_string().contains("[10, 10, 9]"));
}

#[test]
fn non_finite_intensities_are_excluded_from_the_sample() {
    let mut data = Array3::from_elem((2, 2, 2), 4.0f32);
    data[[0, 0, 0]] = f32::NAN;
    data[[0, 0, 1]] = f32::NAN;
    let volume = Volume::new(data, Affine::identity());
    let seg = Segmentation::new(Array3::ones((2, 2, 2)), Affine::identity());

    let report = generate_report(&volume, &seg, &label_table(), &["label-1"], &StatsConfig::default())
        .expect("report");
    let row = &report.rows[0];
    assert_eq!(row.voxel_count, 8);
    assert_eq!(row.nan_count, 2);
    assert_eq!(row.sum, Some(24.0));
    assert_eq!(row.mean, Some(4.0));
}

proptest! {
    #[test]
    fn single_label_volumes_sum_to_total(
        labels in prop::collection::vec(1u32..5, 60),
        spacing in prop::array::uniform3(0.1f64..3.0),
    ) {
        let affine = Affine::from_spacing(spacing);
        let seg = Segmentation::from_shape_vec([3, 4, 5], labels, affine).unwrap();
        let volume = Volume::new(Array3::zeros((3, 4, 5)), affine);
        let table = LookupTable::from_definition(&[
            (1, "a", &[]), (2, "b", &[]), (3, "c", &[]), (4, "d", &[]),
        ]).unwrap();

        let report = generate_report(&volume, &seg, &table, &["a", "b", "c", "d"], &StatsConfig::default())
            .unwrap();
        let total: f64 = report.rows.iter().map(|r| r.volume_mm3).sum();
        let expected = 60.0 * volume.voxel_volume();
        prop_assert!((total - expected).abs() <= 1e-9 * expected.max(1.0));
        prop_assert_eq!(report.rows.iter().map(|r| r.voxel_count).sum::<usize>(), 60);
    }
}

const FREESURFER_LUT: &str = "\
#No. Label Name:                R   G   B   A
0   Unknown                     0   0   0   0
2   Left-Cerebral-White-Matter  245 245 245 0
3   Left-Cerebral-Cortex        205 62  78  0
41  Right-Cerebral-White-Matter 0   225 0   0
42  Right-Cerebral-Cortex       205 62  78  0
";

struct Workspace {
    _dir: TempDir,
    lut: PathBuf,
    segmentation: PathBuf,
    mri: Vec<PathBuf>,
}

fn build_workspace() -> Workspace {
    // Two timepoints over one 2x2x2 segmentation with 2 mm isotropic voxels.
    let dir = tempdir().expect("tempdir");
    let affine = *Affine::from_spacing([2.0, 2.0, 2.0]).matrix();

    let lut = dir.path().join("FreeSurferColorLUT.txt");
    std::fs::write(&lut, FREESURFER_LUT).expect("write lut");

    let segmentation = dir.path().join("sub-01_seg-aseg.json");
    json::write_document(
        &segmentation,
        &VolumeDocument {
            shape: [2, 2, 2],
            affine,
            data: vec![0u32, 2, 2, 3, 41, 42, 42, 0],
        },
    )
    .expect("write segmentation");

    let mri = ["sub-01_ses-01_concentration.json", "sub-01_ses-02_concentration.json"]
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let path = dir.path().join(name);
            let scale = (idx + 1) as f32;
            json::write_document(
                &path,
                &VolumeDocument {
                    shape: [2, 2, 2],
                    affine,
                    data: (0..8).map(|v| v as f32 * scale).collect(),
                },
            )
            .expect("write mri");
            path
        })
        .collect();

    Workspace {
        _dir: dir,
        lut,
        segmentation,
        mri,
    }
}

#[test]
fn file_workflow_with_freesurfer_table() {
    let ws = build_workspace();
    let groups = vec![
        "cerebral-wm".to_string(),
        "Right-Cerebral-Cortex".to_string(),
        "left-hemisphere".to_string(),
    ];
    let config = StatsConfig::default();
    let info = ReportInfo {
        subject: Some("sub-01".to_string()),
        ..Default::default()
    };
    let request = ComputeRequest {
        segmentation: &ws.segmentation,
        mri: &ws.mri,
        lut: Some(&ws.lut),
        groups: &groups,
        config: &config,
        info: &info,
        metadata: MetadataOptions::default(),
    };
    let reports = compute_reports(&request).expect("reports");
    assert_eq!(reports.len(), 2);

    let first = &reports[0];
    assert_eq!(first.info.subject.as_deref(), Some("sub-01"));
    assert_eq!(
        first.info.mri_data.as_deref(),
        Some("sub-01_ses-01_concentration.json")
    );

    // Labels 2 and 41 are white matter: voxels 1, 2 and 4 with intensities 1, 2, 4.
    let wm = first.row("cerebral-wm").expect("wm row");
    assert_eq!(wm.voxel_count, 3);
    assert_eq!(wm.volume_mm3, 24.0);
    assert!((wm.volume_ml - 0.024).abs() < 1e-12);
    assert_eq!(wm.median, Some(2.0));
    assert!(wm.labels.contains(&3000));

    let left = first.row("left-hemisphere").expect("left row");
    let left_labels: BTreeSet<u32> = left.labels.iter().copied().collect();
    assert_eq!(left_labels, BTreeSet::from([2, 3]));
    assert_eq!(left.voxel_count, 3);

    // Second timepoint doubles every intensity.
    let wm2 = reports[1].row("cerebral-wm").expect("wm row");
    assert_eq!(wm2.mean.zip(wm.mean).map(|(b, a)| b / a), Some(2.0));

    let csv = report::to_csv(&reports, ';');
    assert_eq!(csv.lines().count(), 1 + 2 * groups.len());
    assert!(csv.lines().nth(1).unwrap().starts_with("sub-01_seg-aseg.json;"));

    let stats_path = ws.segmentation.with_file_name("stats.json");
    json::write_reports(&stats_path, &reports).expect("write stats");
    let mean = get_value(&stats_path, "Right-Cerebral-Cortex", "mean", ';').expect("mean");
    assert_eq!(mean, Some(5.5));
    assert!(get_value(&stats_path, "Right-Cerebral-Cortex", "PC12", ';').is_err());
    assert!(get_value(&stats_path, "brainstem", "mean", ';').is_err());
}

#[test]
fn get_reads_the_default_csv_export() {
    let ws = build_workspace();
    let groups = vec!["Right-Cerebral-Cortex".to_string(), "cerebellar-wm".to_string()];
    let config = StatsConfig::default();
    let info = ReportInfo::default();
    let request = ComputeRequest {
        segmentation: &ws.segmentation,
        mri: &ws.mri,
        lut: Some(&ws.lut),
        groups: &groups,
        config: &config,
        info: &info,
        metadata: MetadataOptions::default(),
    };
    let reports = compute_reports(&request).expect("reports");

    let stats_path = ws.segmentation.with_file_name("stats.csv");
    std::fs::write(&stats_path, report::to_csv(&reports, ';')).expect("write csv");

    // Rows of the first MRI come first; labels 42 hold intensities 5 and 6.
    let mean = get_value(&stats_path, "Right-Cerebral-Cortex", "mean", ';').expect("mean");
    assert_eq!(mean, Some(5.5));
    let pc75 = get_value(&stats_path, "Right-Cerebral-Cortex", "PC75", ';').expect("pc75");
    assert_eq!(pc75, Some(5.75));
    let voxels = get_value(&stats_path, "Right-Cerebral-Cortex", "voxelcount", ';').expect("count");
    assert_eq!(voxels, Some(2.0));
    assert_eq!(get_value(&stats_path, "cerebellar-wm", "median", ';').expect("median"), None);
    assert!(get_value(&stats_path, "brainstem", "mean", ';').is_err());
    assert!(get_value(&stats_path, "Right-Cerebral-Cortex", "PC12", ';').is_err());
}

const TIMETABLE: &str = "\
subject\tsession\tsequence_label\tacquisition_relative_injection
sub-01\tses-01\tmixed\t-6414.9
";

#[test]
fn file_name_patterns_and_timetable_fill_report_info() {
    let ws = build_workspace();
    let timetable = ws.segmentation.with_file_name("timetable.tsv");
    std::fs::write(&timetable, TIMETABLE).expect("write timetable");

    let groups = vec!["Right-Cerebral-Cortex".to_string()];
    let config = StatsConfig::default();
    let info = ReportInfo::default();
    let request = ComputeRequest {
        segmentation: &ws.segmentation,
        mri: &ws.mri,
        lut: Some(&ws.lut),
        groups: &groups,
        config: &config,
        info: &info,
        metadata: MetadataOptions {
            seg_pattern: Some(r"(?P<subject>sub-\d{2})_seg-(?P<segmentation>[^\.]+)"),
            mri_pattern: Some(r"(?P<subject>sub-\d{2})_(?P<session>ses-\d{2})_(?P<mri_data>[^\.]+)"),
            timetable: Some(&timetable),
            timelabel: Some("Mixed"),
        },
    };
    let reports = compute_reports(&request).expect("reports");

    let first = &reports[0].info;
    assert_eq!(first.segmentation.as_deref(), Some("aseg"));
    assert_eq!(first.subject.as_deref(), Some("sub-01"));
    assert_eq!(first.session.as_deref(), Some("ses-01"));
    assert_eq!(first.mri_data.as_deref(), Some("concentration"));
    assert_eq!(first.timestamp, Some(-6414.9));

    // The second session has no timetable row.
    assert_eq!(reports[1].info.session.as_deref(), Some("ses-02"));
    assert_eq!(reports[1].info.timestamp, None);

    let csv = report::to_csv(&reports, ';');
    let mut lines = csv.lines();
    assert!(lines
        .next()
        .unwrap()
        .starts_with("segmentation;mri_data;subject;session;timestamp;label;"));
    assert!(lines
        .next()
        .unwrap()
        .starts_with("aseg;concentration;sub-01;ses-01;-6414.9;42;"));
    assert!(lines
        .next()
        .unwrap()
        .starts_with("aseg;concentration;sub-01;ses-02;;42;"));
}

#[test]
fn mismatched_file_name_pattern_fails_the_run() {
    let ws = build_workspace();
    let config = StatsConfig::default();
    let info = ReportInfo::default();
    let request = ComputeRequest {
        segmentation: &ws.segmentation,
        mri: &ws.mri,
        lut: Some(&ws.lut),
        groups: &[],
        config: &config,
        info: &info,
        metadata: MetadataOptions {
            mri_pattern: Some(r"(?P<subject>patient-\d+)"),
            ..Default::default()
        },
    };
    let err = compute_reports(&request).unwrap_err();
    assert!(format!("{:#}", err).contains("does not match the provided pattern"));
}

#[test]
fn default_requests_include_present_regions_and_builtin_groups() {
    let ws = build_workspace();
    let config = StatsConfig::default().with_parallel(false);
    let info = ReportInfo::default();
    let request = ComputeRequest {
        segmentation: &ws.segmentation,
        mri: &ws.mri[..1],
        lut: Some(&ws.lut),
        groups: &[],
        config: &config,
        info: &info,
        metadata: MetadataOptions::default(),
    };
    let reports = compute_reports(&request).expect("reports");
    let names: Vec<&str> = reports[0].rows.iter().map(|r| r.group_name.as_str()).collect();
    assert_eq!(
        &names[..4],
        &[
            "Left-Cerebral-White-Matter",
            "Left-Cerebral-Cortex",
            "Right-Cerebral-White-Matter",
            "Right-Cerebral-Cortex"
        ]
    );
    assert_eq!(names.len(), 4 + 8);

    // Groups with no voxels in this tiny segmentation still get rows.
    let cerebellar = reports[0].row("cerebellar-wm").expect("row");
    assert_eq!(cerebellar.voxel_count, 0);
    assert!(cerebellar.mean.is_none());
}

#[test]
fn missing_input_files_fail_before_any_work() {
    let ws = build_workspace();
    let config = StatsConfig::default();
    let info = ReportInfo::default();
    let mut mri = ws.mri.clone();
    mri.push(ws.segmentation.with_file_name("missing.json"));
    let request = ComputeRequest {
        segmentation: &ws.segmentation,
        mri: &mri,
        lut: Some(&ws.lut),
        groups: &[],
        config: &config,
        info: &info,
        metadata: MetadataOptions::default(),
    };
    let err = compute_reports(&request).unwrap_err();
    assert!(err.to_string().contains("Missing MRI file"));
}
