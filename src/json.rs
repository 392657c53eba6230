//
// json.rs
// Mri-Stats-rs
//
// Reads volume documents and reads/writes statistics reports as JSON.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::Report;
use crate::volume::{Affine, Segmentation, Shape, Volume};

/// On-disk form of a 3-D array: row-major `data` for a grid of `shape`, plus the
/// voxel-to-world affine (identity when omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDocument<T> {
    pub shape: Shape,
    #[serde(default = "identity_matrix")]
    pub affine: [[f64; 4]; 4],
    pub data: Vec<T>,
}

fn identity_matrix() -> [[f64; 4]; 4] {
    *Affine::identity().matrix()
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<VolumeDocument<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse volume document {:?}", path))
}

pub fn read_volume(path: &Path) -> Result<Volume> {
    let doc: VolumeDocument<f32> = read_document(path)?;
    Volume::from_shape_vec(doc.shape, doc.data, Affine::new(doc.affine))
        .with_context(|| format!("Invalid intensity volume {:?}", path))
}

pub fn read_segmentation(path: &Path) -> Result<Segmentation> {
    let doc: VolumeDocument<u32> = read_document(path)?;
    Segmentation::from_shape_vec(doc.shape, doc.data, Affine::new(doc.affine))
        .with_context(|| format!("Invalid segmentation {:?}", path))
}

pub fn write_document<T: Serialize>(path: &Path, document: &VolumeDocument<T>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer(BufWriter::new(file), document).context("Failed to write volume document")
}

/// Reports as a pretty JSON array; undefined statistics become `null`.
pub fn reports_to_string(reports: &[Report]) -> Result<String> {
    serde_json::to_string_pretty(reports).context("Failed to serialize reports to JSON")
}

pub fn write_reports(path: &Path, reports: &[Report]) -> Result<()> {
    let json = reports_to_string(reports)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write JSON to {:?}", path))
}

pub fn read_reports(path: &Path) -> Result<Vec<Report>> {
    let file = File::open(path).with_context(|| format!("Stats file not found: {:?}", path))?;
    serde_json::from_reader(BufReader::new(file)).context("Failed to parse stats file")
}
