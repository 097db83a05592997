//! Prediction and inference
//!
//! Feeds built feature tables to a trained forecaster.

pub mod inference;

pub use inference::{DailyForecast, Forecast, Forecaster, Predictor};
