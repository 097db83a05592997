//! Data ingestion and storage
//!
//! Reservation input, the SQLite store, event calendars and feature tables.

pub mod database;
pub mod dataset;
pub mod events;
pub mod reservations;
pub mod tables;

pub use database::Database;
pub use dataset::{FeatureLayout, RoomTypeDataset};
pub use events::EventCalendar;
pub use reservations::ReservationReader;
pub use tables::DatasetWriter;
