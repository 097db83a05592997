//! Feature engineering
//!
//! Turns reservation records into per-room-type occupancy features.

pub mod events;
pub mod exploder;
pub mod occupancy;
pub mod ranking;
pub mod scaling;
pub mod temporal;

pub use events::EventOverlay;
pub use exploder::RoomTypeExploder;
pub use occupancy::{OccupancyAggregator, OccupancyTable};
pub use ranking::RankTables;
pub use scaling::{Normalizer, RobustScaler};
pub use temporal::TemporalFeatureBuilder;
