//! End-to-end feature table construction
//!
//! A single linear pass: aggregate, explode, rank, build temporal features,
//! overlay events, scale, write. Any error aborts the whole run and nothing
//! is written.

use std::path::PathBuf;

use crate::data::dataset::{FeatureLayout, RoomTypeDataset};
use crate::data::events::EventCalendar;
use crate::data::tables::DatasetWriter;
use crate::features::events::EventOverlay;
use crate::features::exploder::RoomTypeExploder;
use crate::features::occupancy::OccupancyAggregator;
use crate::features::ranking::RankTables;
use crate::features::scaling::{Normalizer, Winsorizer};
use crate::features::temporal::TemporalFeatureBuilder;
use crate::{LumenError, PipelineConfig, ReservationRecord, Result, ScalingConfig};

/// Runs every stage for all configured room types
pub struct FeaturePipeline {
    config: PipelineConfig,
    calendar: EventCalendar,
    normalizer: Normalizer,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig, calendar: EventCalendar) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::new(&FeatureLayout::from_config(&config));
        Ok(FeaturePipeline {
            config,
            calendar,
            normalizer,
        })
    }

    pub fn with_scaling(mut self, scaling: &ScalingConfig) -> Self {
        if let Some(winsorize) = scaling.winsorize {
            log::info!(
                "Winsorizing scaled columns to [{}, {}] quantiles",
                winsorize.lower,
                winsorize.upper
            );
            self.normalizer = self.normalizer.with_winsorizer(Winsorizer::from(winsorize));
        }
        self
    }

    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout::from_config(&self.config)
    }

    /// Build the scaled per-room-type tables, in configured room type order
    pub fn build(&self, records: &[ReservationRecord]) -> Result<Vec<RoomTypeDataset>> {
        let table = OccupancyAggregator::from_config(&self.config).aggregate(records)?;
        if table.is_empty() {
            return Err(LumenError::EmptyInput);
        }

        let samples = RoomTypeExploder::explode(&table);
        let ranks = RankTables::from_table(&table);
        let builder = TemporalFeatureBuilder::new(self.layout());
        let overlay = EventOverlay::new(&self.calendar);

        let room_types = table.room_types().to_vec();
        let mut datasets = Vec::with_capacity(room_types.len());
        for (slot, &room_type) in room_types.iter().enumerate() {
            let selected = RoomTypeExploder::select(&samples, &room_types, room_type);
            let dataset = builder.build(room_type, slot, &selected, &ranks);
            let dataset = overlay.apply(dataset)?;
            let dataset = self.normalizer.apply(dataset);
            log::debug!("{}: {} rows ready", room_type, dataset.len());
            datasets.push(dataset);
        }

        log::info!(
            "Built {} room type tables over {} stay dates",
            datasets.len(),
            table.len()
        );
        Ok(datasets)
    }

    /// Build and write all tables; returns the written paths
    pub fn run(&self, records: &[ReservationRecord], writer: &DatasetWriter) -> Result<Vec<PathBuf>> {
        let datasets = self.build(records)?;
        writer.write_all(&datasets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::scaling::quantile;
    use crate::{ReservationStatus, RoomTypeId, WinsorizeConfig};
    use chrono::NaiveDate;

    const EVENTS: &str = r#"[
        {"name": "Festival", "date": [{"start_date": "2024-01-03", "finish_date": "2024-01-04"}]}
    ]"#;
    const ASSIGNMENTS: &str =
        r#"{"1": ["Festival"], "2": [], "3": [], "4": [], "5": [], "6": [], "7": [], "11": ["Festival"]}"#;

    fn calendar() -> EventCalendar {
        EventCalendar::from_json(EVENTS, ASSIGNMENTS).unwrap()
    }

    fn reservation(date: NaiveDate, room: u32, cnt: u32, status: &str) -> ReservationRecord {
        ReservationRecord {
            stay_date: date,
            room_category_id: RoomTypeId(room),
            room_cnt: cnt,
            reservation_status: ReservationStatus::from_label(status),
            cancel_date: None,
        }
    }

    /// 14 days of 5 rooms of type 1 after two warm-up rows
    fn constant_records() -> Vec<ReservationRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut records = vec![
            reservation(start, 1, 50, "Checked-out"),
            reservation(start, 1, 50, "Checked-out"),
            reservation(start, 3, 9, "Cancelled"),
        ];
        for day in 0..14 {
            let date = start + chrono::Duration::days(day);
            records.push(reservation(date, 1, 3, "Checked-out"));
            records.push(reservation(date, 1, 2, "Checked-out"));
            records.push(reservation(date, 2, 4, "No-show"));
        }
        records
    }

    /// Pipeline whose normalizer touches no columns
    fn unscaled_pipeline() -> FeaturePipeline {
        let mut pipeline = FeaturePipeline::new(PipelineConfig::default(), calendar()).unwrap();
        pipeline.normalizer = Normalizer::with_columns(Vec::new());
        pipeline
    }

    #[test]
    fn test_constant_occupancy_scenario() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default(), calendar()).unwrap();
        let datasets = pipeline.build(&constant_records()).unwrap();

        assert_eq!(datasets.len(), 8);
        let room1 = &datasets[0];
        assert_eq!(room1.room_type, RoomTypeId(1));
        assert_eq!(room1.len(), 14);
        assert!(room1.rows.iter().all(|r| r.occupancy == 5.0));
        assert!(room1
            .rows
            .iter()
            .all(|r| r.forward.iter().all(|v| *v == Some(5.0))));

        for other in &datasets[1..] {
            assert_eq!(other.len(), 14);
            assert!(other.rows.iter().all(|r| r.occupancy == 0.0));
        }
    }

    #[test]
    fn test_constant_scenario_before_scaling() {
        let pipeline = unscaled_pipeline();
        let datasets = pipeline.build(&constant_records()).unwrap();
        let room1 = &datasets[0];

        for row in &room1.rows {
            assert!(row.lags.iter().all(|v| *v == Some(5.0)));
        }
        for row in &room1.rows[7..] {
            assert_eq!(row.mean_last, 5.0);
        }
    }

    #[test]
    fn test_events_counted_for_assigned_rooms() {
        let pipeline = unscaled_pipeline();
        let datasets = pipeline.build(&constant_records()).unwrap();

        let room1_events: Vec<f64> = datasets[0].rows.iter().take(5).map(|r| r.event).collect();
        assert_eq!(room1_events, vec![0.0, 0.0, 1.0, 1.0, 0.0]);
        assert!(datasets[1].rows.iter().all(|r| r.event == 0.0));
    }

    #[test]
    fn test_empty_input_rejected() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default(), calendar()).unwrap();
        let records = vec![reservation(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1, 1, "Cancelled")];
        assert!(matches!(pipeline.build(&records), Err(LumenError::EmptyInput)));
    }

    #[test]
    fn test_missing_assignment_aborts_without_output() {
        let calendar = EventCalendar::from_json(EVENTS, r#"{"1": []}"#).unwrap();
        let pipeline = FeaturePipeline::new(PipelineConfig::default(), calendar).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path(), pipeline.layout());

        assert!(pipeline.run(&constant_records(), &writer).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_runs_are_byte_identical() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default(), calendar()).unwrap();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let records = constant_records();
        let a = pipeline
            .run(&records, &DatasetWriter::new(first.path(), pipeline.layout()))
            .unwrap();
        let b = pipeline
            .run(&records, &DatasetWriter::new(second.path(), pipeline.layout()))
            .unwrap();

        assert_eq!(a.len(), 8);
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(std::fs::read(left).unwrap(), std::fs::read(right).unwrap());
        }
    }

    /// Ten days of two room types, the second at ten times the first
    fn two_scale_setup() -> (FeaturePipeline, Vec<ReservationRecord>) {
        let config = PipelineConfig {
            room_type_ids: vec![1, 2],
            warmup_skip: 0,
            ..PipelineConfig::default()
        };
        let calendar = EventCalendar::from_json("[]", r#"{"1": [], "2": []}"#).unwrap();
        let pipeline = FeaturePipeline::new(config, calendar).unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut records = Vec::new();
        for day in 0..10u32 {
            let date = start + chrono::Duration::days(day as i64);
            let base = day % 3 + 1;
            records.push(reservation(date, 1, base, "Checked-out"));
            records.push(reservation(date, 2, base * 10, "Checked-out"));
        }
        (pipeline, records)
    }

    fn week_day_avgs(dataset: &RoomTypeDataset) -> Vec<f64> {
        dataset.rows.iter().map(|r| r.week_day_avg).collect()
    }

    #[test]
    fn test_scaler_fitted_per_room_type() {
        let (pipeline, records) = two_scale_setup();
        let datasets = pipeline.build(&records).unwrap();
        assert_eq!(datasets.len(), 2);

        for dataset in &datasets {
            let mut values = week_day_avgs(dataset);
            values.sort_by(|a, b| a.total_cmp(b));
            assert!(quantile(&values, 0.5).abs() < 1e-12);
        }

        // A room on ten times the scale lands on the same scaled values
        let small = week_day_avgs(&datasets[0]);
        let large = week_day_avgs(&datasets[1]);
        for (a, b) in small.iter().zip(&large) {
            assert!((a - b).abs() < 1e-9);
        }
        // Targets stay in room counts
        assert_eq!(datasets[1].rows[0].occupancy, 10.0);
    }

    #[test]
    fn test_missing_lags_survive_scaling() {
        let (pipeline, records) = two_scale_setup();
        let datasets = pipeline.build(&records).unwrap();

        // Row 3 has no lag_4: no history and row 10 does not exist
        let row = &datasets[0].rows[3];
        assert_eq!(row.lags[3], None);
        assert!(row.lags[0].is_some());
        assert!(datasets[1].rows[9].lags[6].is_some());
    }

    #[test]
    fn test_default_scaling_does_not_clip() {
        let (pipeline, records) = two_scale_setup();
        let plain = pipeline.build(&records).unwrap();

        let (pipeline, _) = two_scale_setup();
        let defaulted = pipeline
            .with_scaling(&ScalingConfig::default())
            .build(&records)
            .unwrap();
        assert_eq!(plain, defaulted);

        let (pipeline, _) = two_scale_setup();
        let clipped = pipeline
            .with_scaling(&ScalingConfig {
                winsorize: Some(WinsorizeConfig::default()),
            })
            .build(&records)
            .unwrap();
        assert_ne!(plain, clipped);

        // Saturday carries the largest weekday average; clipping pulls it down
        let saturday = 5;
        assert!(clipped[0].rows[saturday].week_day_avg < plain[0].rows[saturday].week_day_avg);
    }
}
