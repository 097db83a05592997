//! Per-room-type feature tables
//!
//! A `RoomTypeDataset` holds one room type's rows in ascending date order.
//! Column naming and ordering live in `FeatureLayout` so that the writer,
//! the reader and the inference adapter agree on them.

use crate::{LumenError, PipelineConfig, Result, RoomTypeId};
use chrono::NaiveDate;

/// A column of a per-room-type feature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Occupancy,
    DayOfWeek,
    WeekDayAvg,
    MonthAvg,
    WeekDayImportance,
    Event,
    /// Occupancy k rows earlier (1-based)
    Lag(usize),
    MeanLast,
    MaxLast,
    MinLast,
    /// Occupancy k rows ahead (1-based)
    Forward(usize),
}

/// Window sizes that determine column names and counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLayout {
    pub lag_window: usize,
    pub rolling_window: usize,
    pub forecast_horizon: usize,
}

impl Default for FeatureLayout {
    fn default() -> Self {
        FeatureLayout::from_config(&PipelineConfig::default())
    }
}

impl FeatureLayout {
    pub fn from_config(config: &PipelineConfig) -> Self {
        FeatureLayout {
            lag_window: config.lag_window,
            rolling_window: config.rolling_window,
            forecast_horizon: config.forecast_horizon,
        }
    }

    pub fn column_name(&self, column: Column) -> String {
        match column {
            Column::Occupancy => "occupancy".to_string(),
            Column::DayOfWeek => "day_of_week".to_string(),
            Column::WeekDayAvg => "week_day_avg".to_string(),
            Column::MonthAvg => "month_avg".to_string(),
            Column::WeekDayImportance => "week_day_importance".to_string(),
            Column::Event => "event".to_string(),
            Column::Lag(k) => format!("occupancy_lag_{}", k),
            Column::MeanLast => format!("mean_last_{}", self.rolling_window),
            Column::MaxLast => format!("max_last_{}", self.rolling_window),
            Column::MinLast => format!("min_last_{}", self.rolling_window),
            Column::Forward(k) => format!("occupancy_{}", k),
        }
    }

    fn lags(&self) -> impl Iterator<Item = Column> {
        (1..=self.lag_window).map(Column::Lag)
    }

    /// Columns of a written table, after the `stay_date` index
    pub fn output_columns(&self) -> Vec<Column> {
        let mut columns = vec![
            Column::Occupancy,
            Column::DayOfWeek,
            Column::WeekDayAvg,
            Column::MonthAvg,
            Column::WeekDayImportance,
            Column::Event,
        ];
        columns.extend(self.lags());
        columns.extend([Column::MeanLast, Column::MaxLast, Column::MinLast]);
        columns.extend((1..=self.forecast_horizon).map(Column::Forward));
        columns
    }

    /// Ordered model inputs; consumers rely on this exact order
    pub fn inference_columns(&self) -> Vec<Column> {
        let mut columns = vec![
            Column::DayOfWeek,
            Column::WeekDayAvg,
            Column::MonthAvg,
            Column::WeekDayImportance,
            Column::Event,
        ];
        columns.extend(self.lags());
        columns.push(Column::MeanLast);
        columns
    }

    /// Columns rescaled by the normalizer; targets are left alone
    pub fn scaled_columns(&self) -> Vec<Column> {
        let mut columns = vec![
            Column::WeekDayAvg,
            Column::MonthAvg,
            Column::WeekDayImportance,
            Column::MeanLast,
            Column::MaxLast,
            Column::MinLast,
            Column::Event,
        ];
        columns.extend(self.lags());
        columns
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once("stay_date".to_string())
            .chain(self.output_columns().into_iter().map(|c| self.column_name(c)))
            .collect()
    }
}

/// One date of a room type's feature table
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub stay_date: NaiveDate,
    pub occupancy: f64,
    /// 0 = Monday
    pub day_of_week: u32,
    pub week_day_avg: f64,
    pub month_avg: f64,
    pub week_day_importance: f64,
    pub event: f64,
    /// `lags[k - 1]` is occupancy_lag_k
    pub lags: Vec<Option<f64>>,
    pub mean_last: f64,
    pub max_last: f64,
    pub min_last: f64,
    /// `forward[k - 1]` is occupancy_k
    pub forward: Vec<Option<f64>>,
}

impl FeatureRow {
    /// Row with only the target set; derived columns are filled by the builder
    pub fn new(stay_date: NaiveDate, occupancy: f64) -> Self {
        FeatureRow {
            stay_date,
            occupancy,
            day_of_week: 0,
            week_day_avg: 0.0,
            month_avg: 0.0,
            week_day_importance: 0.0,
            event: 0.0,
            lags: Vec::new(),
            mean_last: 0.0,
            max_last: 0.0,
            min_last: 0.0,
            forward: Vec::new(),
        }
    }

    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::Occupancy => Some(self.occupancy),
            Column::DayOfWeek => Some(self.day_of_week as f64),
            Column::WeekDayAvg => Some(self.week_day_avg),
            Column::MonthAvg => Some(self.month_avg),
            Column::WeekDayImportance => Some(self.week_day_importance),
            Column::Event => Some(self.event),
            Column::Lag(k) => self.lags.get(k.checked_sub(1)?).copied().flatten(),
            Column::MeanLast => Some(self.mean_last),
            Column::MaxLast => Some(self.max_last),
            Column::MinLast => Some(self.min_last),
            Column::Forward(k) => self.forward.get(k.checked_sub(1)?).copied().flatten(),
        }
    }

    /// Overwrite a float column. Day of week is an integer and is left as is.
    pub fn set_value(&mut self, column: Column, value: f64) {
        match column {
            Column::Occupancy => self.occupancy = value,
            Column::DayOfWeek => {}
            Column::WeekDayAvg => self.week_day_avg = value,
            Column::MonthAvg => self.month_avg = value,
            Column::WeekDayImportance => self.week_day_importance = value,
            Column::Event => self.event = value,
            Column::Lag(k) => {
                if let Some(slot) = k.checked_sub(1).and_then(|i| self.lags.get_mut(i)) {
                    *slot = Some(value);
                }
            }
            Column::MeanLast => self.mean_last = value,
            Column::MaxLast => self.max_last = value,
            Column::MinLast => self.min_last = value,
            Column::Forward(k) => {
                if let Some(slot) = k.checked_sub(1).and_then(|i| self.forward.get_mut(i)) {
                    *slot = Some(value);
                }
            }
        }
    }
}

/// Feature table for a single room type, ordered by date
#[derive(Debug, Clone, PartialEq)]
pub struct RoomTypeDataset {
    pub room_type: RoomTypeId,
    pub rows: Vec<FeatureRow>,
}

impl RoomTypeDataset {
    pub fn new(room_type: RoomTypeId, mut rows: Vec<FeatureRow>) -> Self {
        rows.sort_by_key(|r| r.stay_date);
        RoomTypeDataset { room_type, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn occupancy(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.occupancy).collect()
    }

    pub fn column(&self, column: Column) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.value(column)).collect()
    }

    pub fn row_for(&self, date: NaiveDate) -> Option<&FeatureRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.stay_date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Contract-ordered model inputs for one date
    pub fn feature_vector(&self, date: NaiveDate, layout: &FeatureLayout) -> Result<Vec<f64>> {
        let row = self.row_for(date).ok_or_else(|| LumenError::MissingFeature {
            room_type: self.room_type,
            date,
            column: "stay_date".to_string(),
        })?;
        layout
            .inference_columns()
            .into_iter()
            .map(|column| {
                row.value(column).ok_or_else(|| LumenError::MissingFeature {
                    room_type: self.room_type,
                    date,
                    column: layout.column_name(column),
                })
            })
            .collect()
    }
}
