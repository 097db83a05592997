//! Temporal feature construction
//!
//! Calendar lookups, lags, trailing window statistics and forward targets for
//! one room type's series. Positions are rows in date order, so calendar gaps
//! are not interpolated.

use chrono::Datelike;

use crate::data::dataset::{FeatureLayout, FeatureRow, RoomTypeDataset};
use crate::features::exploder::ExplodedSample;
use crate::features::ranking::RankTables;
use crate::RoomTypeId;

/// Builds a `RoomTypeDataset` from the samples active for one room type
#[derive(Debug, Clone, Copy)]
pub struct TemporalFeatureBuilder {
    layout: FeatureLayout,
}

impl TemporalFeatureBuilder {
    pub fn new(layout: FeatureLayout) -> Self {
        TemporalFeatureBuilder { layout }
    }

    /// `slot` is the room type's position in the rank tables
    pub fn build(
        &self,
        room_type: RoomTypeId,
        slot: usize,
        samples: &[ExplodedSample],
        ranks: &RankTables,
    ) -> RoomTypeDataset {
        let mut rows: Vec<FeatureRow> = samples
            .iter()
            .map(|s| FeatureRow::new(s.stay_date, s.occupancy as f64))
            .collect();
        rows.sort_by_key(|r| r.stay_date);

        let series: Vec<f64> = rows.iter().map(|r| r.occupancy).collect();
        let lags = lag_columns(&series, self.layout.lag_window);
        let forward = forward_columns(&series, self.layout.forecast_horizon, self.layout.lag_window);
        let window = self.layout.rolling_window;

        for (i, row) in rows.iter_mut().enumerate() {
            let weekday = row.stay_date.weekday().num_days_from_monday();
            row.day_of_week = weekday;
            row.week_day_avg = ranks.weekday_avg(weekday, slot).unwrap_or(0.0);
            row.month_avg = ranks.month_avg(row.stay_date.month(), slot).unwrap_or(0.0);
            row.week_day_importance = ranks.weekday_rank(weekday, slot).unwrap_or(0.0);

            row.lags = lags.iter().map(|column| column[i]).collect();
            row.forward = forward.iter().map(|column| column[i]).collect();

            let history = trailing(&series, i, window);
            row.mean_last = history.iter().sum::<f64>() / history.len() as f64;
            row.max_last = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            row.min_last = history.iter().copied().fold(f64::INFINITY, f64::min);
        }

        log::debug!(
            "Built {} temporal rows for {} (lags={}, window={})",
            rows.len(),
            room_type,
            self.layout.lag_window,
            window
        );
        RoomTypeDataset::new(room_type, rows)
    }
}

/// Rows `i - window .. i` once a full window exists, otherwise the
/// expanding history `0 ..= i` (which includes the current row).
fn trailing(series: &[f64], i: usize, window: usize) -> &[f64] {
    if i >= window {
        &series[i - window..i]
    } else {
        &series[..=i]
    }
}

/// `result[k - 1][i]` is the value `k` rows back. Rows without that much
/// history take the lag of row `i + period`, i.e. the same weekday one
/// cycle ahead.
pub fn lag_columns(series: &[f64], period: usize) -> Vec<Vec<Option<f64>>> {
    let n = series.len();
    (1..=period)
        .map(|k| {
            let shifted = |i: usize| i.checked_sub(k).map(|j| series[j]);
            (0..n)
                .map(|i| {
                    shifted(i).or_else(|| {
                        let ahead = i + period;
                        if ahead < n {
                            shifted(ahead)
                        } else {
                            None
                        }
                    })
                })
                .collect()
        })
        .collect()
}

/// `result[k - 1][i]` is the value `k` rows ahead. Tail rows take the same
/// column from row `i - period`.
pub fn forward_columns(series: &[f64], horizon: usize, period: usize) -> Vec<Vec<Option<f64>>> {
    let n = series.len();
    (1..=horizon)
        .map(|k| {
            let shifted = |i: usize| {
                let j = i + k;
                if j < n {
                    Some(series[j])
                } else {
                    None
                }
            };
            (0..n)
                .map(|i| shifted(i).or_else(|| i.checked_sub(period).and_then(shifted)))
                .collect()
        })
        .collect()
}
