use crate::models::{Percentile, SampleStatistics};

/// Reduce a sample of finite intensities to summary statistics.
///
/// `voxel_count` and `volume_mm3` describe the whole mask and are passed through;
/// a zero `voxel_count` always reports a volume of exactly `0.0`. When `values` is
/// empty every statistic is `None`, which keeps "no data" apart from a computed zero.
pub fn compute(
    values: &[f64],
    voxel_count: usize,
    volume_mm3: f64,
    percentile_levels: &[f64],
) -> SampleStatistics {
    let volume_mm3 = if voxel_count == 0 { 0.0 } else { volume_mm3 };

    if values.is_empty() {
        return SampleStatistics {
            voxel_count,
            volume_mm3,
            sum: None,
            mean: None,
            median: None,
            std: None,
            min: None,
            max: None,
            percentiles: percentile_levels
                .iter()
                .map(|&level| Percentile { level, value: None })
                .collect(),
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len() as f64;
    let sum: f64 = sorted.iter().sum();
    let mean = sum / count;
    // Population convention: a single voxel has std 0.
    let variance = sorted
        .iter()
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;

    SampleStatistics {
        voxel_count,
        volume_mm3,
        sum: Some(sum),
        mean: Some(mean),
        median: median_sorted(&sorted),
        std: Some(variance.sqrt()),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        percentiles: percentile_levels
            .iter()
            .map(|&level| Percentile {
                level,
                value: percentile_sorted(&sorted, level),
            })
            .collect(),
    }
}

/// Middle value, or the mean of the two middle values for an even count.
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Linear-interpolation percentile on sorted data, `level` in [0, 100].
/// Rank `(n - 1) * level / 100` is interpolated between its neighbouring order
/// statistics.
pub fn percentile_sorted(sorted: &[f64], level: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=100.0).contains(&level) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let rank = (n - 1) as f64 * level / 100.0;
    let lower = rank.floor() as usize;
    let frac = rank - rank.floor();
    if lower + 1 >= n {
        return Some(sorted[n - 1]);
    }
    Some(sorted[lower] + frac * (sorted[lower + 1] - sorted[lower]))
}
