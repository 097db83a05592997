//! Daily occupancy aggregation
//!
//! Collapses reservation rows into a date × room-type count matrix.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::{LumenError, PipelineConfig, ReservationRecord, Result, RoomTypeId};

/// One date of the occupancy matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyRow {
    pub stay_date: NaiveDate,
    /// One count per configured room type, in slot order
    pub counts: Vec<u32>,
}

/// Dense date × room-type occupancy matrix, dates ascending and unique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyTable {
    room_types: Vec<RoomTypeId>,
    rows: Vec<OccupancyRow>,
}

impl OccupancyTable {
    /// Build from `(date, counts)` pairs; duplicate dates are summed
    pub fn from_rows(room_types: Vec<RoomTypeId>, rows: Vec<(NaiveDate, Vec<u32>)>) -> Result<Self> {
        let width = room_types.len();
        let mut by_date: BTreeMap<NaiveDate, Vec<u32>> = BTreeMap::new();
        for (date, counts) in rows {
            let slots = by_date.entry(date).or_insert_with(|| vec![0; width]);
            for (slot, count) in counts.into_iter().enumerate().take(width) {
                add_count(slots, slot, count, &room_types, date)?;
            }
        }
        Ok(Self::from_map(room_types, by_date))
    }

    fn from_map(room_types: Vec<RoomTypeId>, by_date: BTreeMap<NaiveDate, Vec<u32>>) -> Self {
        OccupancyTable {
            room_types,
            rows: by_date
                .into_iter()
                .map(|(stay_date, counts)| OccupancyRow { stay_date, counts })
                .collect(),
        }
    }

    pub fn room_types(&self) -> &[RoomTypeId] {
        &self.room_types
    }

    pub fn rows(&self) -> &[OccupancyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn slot_of(&self, room_type: RoomTypeId) -> Option<usize> {
        self.room_types.iter().position(|r| *r == room_type)
    }

    /// Count series for one slot, in date order
    pub fn series(&self, slot: usize) -> Vec<u32> {
        self.rows.iter().map(|r| r.counts[slot]).collect()
    }
}

/// Turns reservation records into an `OccupancyTable`
#[derive(Debug, Clone)]
pub struct OccupancyAggregator {
    room_types: Vec<RoomTypeId>,
    warmup_skip: usize,
}

impl OccupancyAggregator {
    pub fn new(room_types: Vec<RoomTypeId>, warmup_skip: usize) -> Self {
        OccupancyAggregator {
            room_types,
            warmup_skip,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.room_types(), config.warmup_skip)
    }

    /// Drop cancelled and no-show stays, skip the warm-up head, then sum
    /// `room_cnt` per (date, room type). A sum that does not fit a `u32` is
    /// an error.
    pub fn aggregate(&self, records: &[ReservationRecord]) -> Result<OccupancyTable> {
        let width = self.room_types.len();
        let mut by_date: BTreeMap<NaiveDate, Vec<u32>> = BTreeMap::new();
        let mut unknown = 0usize;
        let mut kept = 0usize;

        let active = records
            .iter()
            .filter(|r| !r.reservation_status.is_cancelled())
            .skip(self.warmup_skip);

        for record in active {
            kept += 1;
            let counts = by_date
                .entry(record.stay_date)
                .or_insert_with(|| vec![0; width]);
            match self.room_types.iter().position(|r| *r == record.room_category_id) {
                Some(slot) => add_count(
                    counts,
                    slot,
                    record.room_cnt,
                    &self.room_types,
                    record.stay_date,
                )?,
                None => unknown += 1,
            }
        }

        if unknown > 0 {
            log::warn!(
                "Ignored {} reservations with room categories outside {:?}",
                unknown,
                self.room_types.iter().map(|r| r.0).collect::<Vec<_>>()
            );
        }
        log::info!(
            "Aggregated {} of {} reservations into {} stay dates",
            kept,
            records.len(),
            by_date.len()
        );

        Ok(OccupancyTable::from_map(self.room_types.clone(), by_date))
    }
}

fn add_count(
    counts: &mut [u32],
    slot: usize,
    count: u32,
    room_types: &[RoomTypeId],
    date: NaiveDate,
) -> Result<()> {
    counts[slot] = counts[slot]
        .checked_add(count)
        .ok_or(LumenError::CountOverflow {
            room_type: room_types[slot],
            date,
        })?;
    Ok(())
}
