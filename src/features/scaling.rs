//! Robust per-column scaling
//!
//! Centers on the median and divides by the inter-quartile range. Fitted
//! separately for each room type's dataset.

use crate::data::dataset::{Column, FeatureLayout, RoomTypeDataset};
use crate::WinsorizeConfig;

/// Quantile with linear interpolation between order statistics.
/// `sorted` must be ascending and non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = position - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }
}

fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| a.total_cmp(b));
    present
}

/// Median / IQR scaler for one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustScaler {
    pub center: f64,
    pub scale: f64,
}

impl Default for RobustScaler {
    fn default() -> Self {
        RobustScaler {
            center: 0.0,
            scale: 1.0,
        }
    }
}

impl RobustScaler {
    /// Missing values are ignored. A zero IQR scales by 1.
    pub fn fit(values: &[Option<f64>]) -> Self {
        let sorted = sorted_present(values);
        if sorted.is_empty() {
            return Self::default();
        }
        let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
        RobustScaler {
            center: quantile(&sorted, 0.5),
            scale: if iqr == 0.0 { 1.0 } else { iqr },
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

/// Quantile clipping, only run when configured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Winsorizer {
    pub lower: f64,
    pub upper: f64,
}

impl From<WinsorizeConfig> for Winsorizer {
    fn from(config: WinsorizeConfig) -> Self {
        Winsorizer {
            lower: config.lower,
            upper: config.upper,
        }
    }
}

impl Winsorizer {
    pub fn clip(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let sorted = sorted_present(values);
        if sorted.is_empty() {
            return values.to_vec();
        }
        let low = quantile(&sorted, self.lower);
        let high = quantile(&sorted, self.upper);
        values
            .iter()
            .map(|v| v.map(|x| x.max(low).min(high)))
            .collect()
    }
}

/// Scales a fixed set of feature columns within one dataset
#[derive(Debug, Clone)]
pub struct Normalizer {
    columns: Vec<Column>,
    winsorizer: Option<Winsorizer>,
}

impl Normalizer {
    pub fn new(layout: &FeatureLayout) -> Self {
        Self::with_columns(layout.scaled_columns())
    }

    pub fn with_columns(columns: Vec<Column>) -> Self {
        Normalizer {
            columns,
            winsorizer: None,
        }
    }

    pub fn with_winsorizer(mut self, winsorizer: Winsorizer) -> Self {
        self.winsorizer = Some(winsorizer);
        self
    }

    pub fn apply(&self, mut dataset: RoomTypeDataset) -> RoomTypeDataset {
        for &column in &self.columns {
            let mut values = dataset.column(column);
            if let Some(winsorizer) = &self.winsorizer {
                values = winsorizer.clip(&values);
            }
            let scaler = RobustScaler::fit(&values);
            for (row, value) in dataset.rows.iter_mut().zip(values) {
                if let Some(v) = value {
                    row.set_value(column, scaler.transform(v));
                }
            }
        }
        dataset
    }
}
