//
// aggregate.rs
// Mri-Stats-rs
//
// Masks the segmentation by a label set and gathers the matching intensities and physical volume.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::BTreeSet;

use ndarray::{Array3, Zip};

use crate::error::Result;
use crate::volume::{ensure_same_shape, Segmentation, Volume};

/// Raw material for one group's statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelSample {
    /// Finite intensities under the mask, in array order.
    pub values: Vec<f64>,
    /// Every mask voxel, finite or not.
    pub voxel_count: usize,
    pub volume_mm3: f64,
    /// Mask voxels whose intensity is NaN or infinite.
    pub nan_count: usize,
}

/// Boolean mask of voxels whose label is in `labels`.
pub fn region_mask(segmentation: &Segmentation, labels: &BTreeSet<u32>) -> Array3<bool> {
    segmentation.labels().mapv(|label| labels.contains(&label))
}

/// Extract the voxels of `segmentation` carrying any label in `labels`.
pub fn extract(
    volume: &Volume,
    segmentation: &Segmentation,
    labels: &BTreeSet<u32>,
) -> Result<VoxelSample> {
    ensure_same_shape(volume, segmentation)?;

    let mask = region_mask(segmentation, labels);
    let voxel_count = mask.iter().filter(|&&inside| inside).count();

    let mut values = Vec::with_capacity(voxel_count);
    let mut nan_count = 0;
    Zip::from(&mask)
        .and(volume.data())
        .for_each(|&inside, &value| {
            if !inside {
                return;
            }
            if value.is_finite() {
                values.push(f64::from(value));
            } else {
                nan_count += 1;
            }
        });

    Ok(VoxelSample {
        values,
        voxel_count,
        volume_mm3: voxel_count as f64 * volume.voxel_volume(),
        nan_count,
    })
}
