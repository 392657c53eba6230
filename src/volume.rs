//
// volume.rs
// Mri-Stats-rs
//
// Co-registered intensity and label volumes with the voxel-to-world affine they share.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::BTreeSet;

use ndarray::Array3;

use crate::error::{Result, StatsError};

/// Voxel grid dimensions (x, y, z).
pub type Shape = [usize; 3];

const SAME_SPACE_RTOL: f64 = 1e-5;
const SAME_SPACE_ATOL: f64 = 1e-8;

/// Homogeneous 4x4 transform from voxel indices to world (mm) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine([[f64; 4]; 4]);

impl Affine {
    pub fn new(matrix: [[f64; 4]; 4]) -> Self {
        Self(matrix)
    }

    pub fn identity() -> Self {
        Self::from_spacing([1.0, 1.0, 1.0])
    }

    /// Axis-aligned affine with the given voxel spacing in mm.
    pub fn from_spacing(spacing: [f64; 3]) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (axis, step) in spacing.iter().enumerate() {
            m[axis][axis] = *step;
        }
        m[3][3] = 1.0;
        Self(m)
    }

    pub fn matrix(&self) -> &[[f64; 4]; 4] {
        &self.0
    }

    /// Physical volume of one voxel in mm³: |det| of the linear 3x3 block.
    /// Shears and rotations are handled by the determinant as well.
    pub fn voxel_volume(&self) -> f64 {
        let m = &self.0;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        det.abs()
    }

    /// Largest element-wise relative deviation from `reference`. Entries that are
    /// zero in both matrices are ignored; a non-zero entry against a zero reference
    /// counts as infinite deviation.
    pub fn max_relative_error(&self, reference: &Affine) -> f64 {
        let mut worst: f64 = 0.0;
        for (row, ref_row) in self.0.iter().zip(reference.0.iter()) {
            for (a, b) in row.iter().zip(ref_row.iter()) {
                let diff = (a - b).abs();
                if diff == 0.0 {
                    continue;
                }
                let rel = if *b == 0.0 { f64::INFINITY } else { diff / b.abs() };
                worst = worst.max(rel);
            }
        }
        worst
    }

    fn is_close(&self, reference: &Affine) -> bool {
        self.0.iter().flatten().zip(reference.0.iter().flatten()).all(|(a, b)| {
            (a - b).abs() <= SAME_SPACE_ATOL + SAME_SPACE_RTOL * b.abs()
        })
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

/// Scalar intensity volume. Borrowed read-only by the engine.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    affine: Affine,
}

impl Volume {
    pub fn new(data: Array3<f32>, affine: Affine) -> Self {
        Self { data, affine }
    }

    /// Build from a row-major flat buffer.
    pub fn from_shape_vec(shape: Shape, data: Vec<f32>, affine: Affine) -> Result<Self> {
        Ok(Self::new(array_from_flat(shape, data)?, affine))
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn shape(&self) -> Shape {
        let (x, y, z) = self.data.dim();
        [x, y, z]
    }

    pub fn voxel_volume(&self) -> f64 {
        self.affine.voxel_volume()
    }
}

/// Integer label map on the same grid as a [`Volume`]. Label 0 is background.
#[derive(Debug, Clone)]
pub struct Segmentation {
    labels: Array3<u32>,
    affine: Affine,
}

impl Segmentation {
    pub fn new(labels: Array3<u32>, affine: Affine) -> Self {
        Self { labels, affine }
    }

    pub fn from_shape_vec(shape: Shape, labels: Vec<u32>, affine: Affine) -> Result<Self> {
        Ok(Self::new(array_from_flat(shape, labels)?, affine))
    }

    pub fn labels(&self) -> &Array3<u32> {
        &self.labels
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn shape(&self) -> Shape {
        let (x, y, z) = self.labels.dim();
        [x, y, z]
    }

    /// Distinct non-background labels occurring in the map.
    pub fn present_labels(&self) -> BTreeSet<u32> {
        self.labels.iter().copied().filter(|&l| l != 0).collect()
    }
}

/// Shape equality only. Cheap enough to repeat at every stage boundary.
pub fn ensure_same_shape(volume: &Volume, segmentation: &Segmentation) -> Result<()> {
    if volume.shape() != segmentation.shape() {
        return Err(StatsError::ShapeMismatch {
            volume: volume.shape(),
            segmentation: segmentation.shape(),
        });
    }
    Ok(())
}

/// Shape equality plus affine agreement within a relative tolerance of 1e-5.
pub fn ensure_same_space(volume: &Volume, segmentation: &Segmentation) -> Result<()> {
    ensure_same_shape(volume, segmentation)?;
    if !volume.affine.is_close(&segmentation.affine) {
        return Err(StatsError::AffineMismatch {
            volume: *volume.affine.matrix(),
            segmentation: *segmentation.affine.matrix(),
            max_relative_error: volume.affine.max_relative_error(&segmentation.affine),
        });
    }
    Ok(())
}

fn array_from_flat<T>(shape: Shape, data: Vec<T>) -> Result<Array3<T>> {
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(StatsError::InvalidShape {
            expected: usize::MAX,
            actual: data.len(),
        })?;
    if data.len() != expected {
        return Err(StatsError::InvalidShape {
            expected,
            actual: data.len(),
        });
    }
    Array3::from_shape_vec((shape[0], shape[1], shape[2]), data).map_err(|_| {
        StatsError::InvalidShape {
            expected,
            actual: expected,
        }
    })
}
