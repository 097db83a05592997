//! Forecast inference over built feature tables

use chrono::NaiveDate;
use std::path::Path;

use crate::data::dataset::{FeatureLayout, RoomTypeDataset};
use crate::data::tables::{read_dataset, table_file_name};
use crate::{LumenError, Result, RoomTypeId};

/// Raw model output for one room type and date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub value: f64,
    pub interval: Option<(f64, f64)>,
}

impl Forecast {
    pub fn point(value: f64) -> Self {
        Forecast {
            value,
            interval: None,
        }
    }
}

/// Any trained model that maps a feature vector to an occupancy forecast
pub trait Forecaster {
    fn forecast(&self, room_type: RoomTypeId, features: &[f64]) -> Result<Forecast>;
}

impl<F> Forecaster for F
where
    F: Fn(RoomTypeId, &[f64]) -> f64,
{
    fn forecast(&self, room_type: RoomTypeId, features: &[f64]) -> Result<Forecast> {
        Ok(Forecast::point(self(room_type, features)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomForecast {
    pub room_type: RoomTypeId,
    pub occupancy: i64,
    pub interval: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub predictions: Vec<RoomForecast>,
}

/// Predictor for making occupancy forecasts
pub struct Predictor<M: Forecaster> {
    model: M,
    datasets: Vec<RoomTypeDataset>,
    layout: FeatureLayout,
}

impl<M: Forecaster> Predictor<M> {
    pub fn new(model: M, datasets: Vec<RoomTypeDataset>, layout: FeatureLayout) -> Self {
        Predictor {
            model,
            datasets,
            layout,
        }
    }

    /// Load the written tables of every room type from `dir`
    pub fn load<P: AsRef<Path>>(
        model: M,
        dir: P,
        room_types: &[RoomTypeId],
        layout: FeatureLayout,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let datasets = room_types
            .iter()
            .map(|&room_type| read_dataset(dir.join(table_file_name(room_type)), room_type, &layout))
            .collect::<Result<Vec<_>>>()?;
        log::info!("Loaded {} feature tables from {}", datasets.len(), dir.display());
        Ok(Self::new(model, datasets, layout))
    }

    /// Forecast every room type for each date in `start..=end`
    pub fn predict_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyForecast>> {
        if start > end {
            return Err(LumenError::Config(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        let mut days = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            let predictions = self
                .datasets
                .iter()
                .map(|dataset| self.predict_room(dataset, date))
                .collect::<Result<Vec<_>>>()?;
            days.push(DailyForecast { date, predictions });
        }
        log::debug!("Forecast {} days for {} room types", days.len(), self.datasets.len());
        Ok(days)
    }

    fn predict_room(&self, dataset: &RoomTypeDataset, date: NaiveDate) -> Result<RoomForecast> {
        let features = dataset.feature_vector(date, &self.layout)?;
        let forecast = self.model.forecast(dataset.room_type, &features)?;
        if !forecast.value.is_finite() {
            return Err(LumenError::InvalidForecast {
                room_type: dataset.room_type,
                date,
                value: forecast.value,
            });
        }
        Ok(RoomForecast {
            room_type: dataset.room_type,
            occupancy: forecast.value.round() as i64,
            interval: forecast.interval,
        })
    }

    pub fn datasets(&self) -> &[RoomTypeDataset] {
        &self.datasets
    }
}
