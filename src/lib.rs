//! Hotel occupancy feature tables
//!
//! Turns reservation-level booking records into per-room-type, date-indexed
//! feature tables for demand forecasting models.

pub mod data;
pub mod features;
pub mod pipeline;
pub mod predict;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Room category identifier as it appears in the booking system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomTypeId(pub u32);

impl fmt::Display for RoomTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room_type_{}", self.0)
    }
}

/// Booking status of a reservation row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Cancelled,
    NoShow,
    Other(String),
}

impl ReservationStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Cancelled" => ReservationStatus::Cancelled,
            "No-show" => ReservationStatus::NoShow,
            other => ReservationStatus::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::NoShow => "No-show",
            ReservationStatus::Other(label) => label,
        }
    }

    /// No-shows are treated the same as cancellations
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single guest stay segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub stay_date: NaiveDate,
    pub room_category_id: RoomTypeId,
    pub room_cnt: u32,
    pub reservation_status: ReservationStatus,
    pub cancel_date: Option<NaiveDate>,
}

/// Columns every reservation source must provide
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "stay_date",
    "room_category_id",
    "room_cnt",
    "reservation_status",
    "cancel_date",
];

/// Application-wide errors
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("Missing required column `{column}` in {origin}")]
    MissingColumn { origin: String, column: String },

    #[error("Parse error in {origin} at line {line}: {message}")]
    Parse {
        origin: String,
        line: u64,
        message: String,
    },

    #[error("Event calendar error: {0}")]
    Events(String),

    #[error("{0} is not configured")]
    UnknownRoomType(RoomTypeId),

    #[error("Occupancy of {room_type} on {date} exceeds the count range")]
    CountOverflow { room_type: RoomTypeId, date: NaiveDate },

    #[error("Forecast for {room_type} on {date} is not a finite number ({value})")]
    InvalidForecast {
        room_type: RoomTypeId,
        date: NaiveDate,
        value: f64,
    },

    #[error("Missing value for `{column}` on {date} in {room_type}")]
    MissingFeature {
        room_type: RoomTypeId,
        date: NaiveDate,
        column: String,
    },

    #[error("No reservations left after filtering - nothing to build")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LumenError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub scaling: ScalingConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Room types in slot order; one output table per entry
    pub room_type_ids: Vec<u32>,
    /// Number of lag columns, also the wrap period for lag and forward fills
    pub lag_window: usize,
    /// Trailing window for mean/max/min statistics
    pub rolling_window: usize,
    /// Number of forward target columns
    pub forecast_horizon: usize,
    /// Records dropped from the head of the filtered reservation sequence
    pub warmup_skip: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Clip scaled columns to these quantiles before fitting; off unless set
    pub winsorize: Option<WinsorizeConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinsorizeConfig {
    pub lower: f64,
    pub upper: f64,
}

impl Default for WinsorizeConfig {
    fn default() -> Self {
        WinsorizeConfig {
            lower: 0.0,
            upper: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub reservations_path: String,
    pub events_path: String,
    pub event_assignments_path: String,
    pub output_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            room_type_ids: vec![1, 2, 3, 4, 5, 6, 7, 11],
            lag_window: 7,
            rolling_window: 7,
            forecast_horizon: 6,
            warmup_skip: 2,
        }
    }
}

impl PipelineConfig {
    pub fn room_types(&self) -> Vec<RoomTypeId> {
        self.room_type_ids.iter().copied().map(RoomTypeId).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.room_type_ids.is_empty() {
            return Err(LumenError::Config("room_type_ids must not be empty".to_string()));
        }
        let mut seen = self.room_type_ids.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.room_type_ids.len() {
            return Err(LumenError::Config(
                "room_type_ids contains duplicates".to_string(),
            ));
        }
        if self.lag_window == 0 || self.rolling_window == 0 {
            return Err(LumenError::Config(
                "lag_window and rolling_window must be at least 1".to_string(),
            ));
        }
        if self.forecast_horizon >= self.lag_window {
            return Err(LumenError::Config(format!(
                "forecast_horizon ({}) must be smaller than lag_window ({})",
                self.forecast_horizon, self.lag_window
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pipeline: PipelineConfig::default(),
            scaling: ScalingConfig::default(),
            data: DataConfig {
                database_path: "data/lumen.db".to_string(),
                reservations_path: "storage/reservations.csv".to_string(),
                events_path: "events/events.json".to_string(),
                event_assignments_path: "events/separated_events.json".to_string(),
                output_dir: "datasets".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LumenError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| LumenError::Config(format!("Failed to parse config: {}", e)))?;
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LumenError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
