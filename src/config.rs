//
// config.rs
// Mri-Stats-rs
//
// Engine configuration: percentile levels and whether groups are computed in parallel.
//
// Thales Matheus Mendonça Santos - October 2026

use crate::error::{Result, StatsError};

pub const DEFAULT_PERCENTILES: [f64; 3] = [25.0, 50.0, 75.0];

/// Options recognised by the statistics engine. The standard deviation convention
/// is always population (denominator n).
#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    percentile_levels: Vec<f64>,
    parallel: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            percentile_levels: DEFAULT_PERCENTILES.to_vec(),
            parallel: true,
        }
    }
}

impl StatsConfig {
    /// Replace the percentile levels. Levels must be finite and within [0, 100];
    /// they are stored sorted and without repeats.
    pub fn with_percentiles(mut self, levels: impl IntoIterator<Item = f64>) -> Result<Self> {
        let mut levels: Vec<f64> = levels.into_iter().collect();
        if let Some(&level) = levels
            .iter()
            .find(|l| !l.is_finite() || !(0.0..=100.0).contains(*l))
        {
            return Err(StatsError::InvalidPercentile { level });
        }
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        self.percentile_levels = levels;
        Ok(self)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn percentile_levels(&self) -> &[f64] {
        &self.percentile_levels
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }
}
