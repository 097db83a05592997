//! One-hot room type explosion
//!
//! Each occupancy row becomes one sample per room type. The sample for slot
//! `j` only sees slot `j`'s count, so its active indicator is `j` when that
//! count is nonzero and falls back to `row_index % width` otherwise.

use chrono::NaiveDate;

use crate::features::occupancy::OccupancyTable;
use crate::RoomTypeId;

/// A single-room-type training sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplodedSample {
    pub stay_date: NaiveDate,
    /// Exactly one entry is 1
    pub indicator: Vec<u8>,
    pub occupancy: u32,
}

impl ExplodedSample {
    pub fn active_slot(&self) -> usize {
        self.indicator.iter().position(|v| *v == 1).unwrap_or(0)
    }
}

/// Pick the active slot of a (masked) count row: first nonzero slot in
/// room-type order, else `row_index % width` with a zero target.
pub fn active_slot(counts: &[u32], row_index: usize) -> (usize, u32) {
    match counts.iter().position(|c| *c != 0) {
        Some(slot) => (slot, counts[slot]),
        None => (row_index % counts.len().max(1), 0),
    }
}

/// Expands an `OccupancyTable` into `width` samples per date
pub struct RoomTypeExploder;

impl RoomTypeExploder {
    pub fn explode(table: &OccupancyTable) -> Vec<ExplodedSample> {
        let width = table.room_types().len();
        let mut samples = Vec::with_capacity(table.len() * width);

        for row in table.rows() {
            for j in 0..width {
                let mut masked = vec![0u32; width];
                masked[j] = row.counts[j];

                let (slot, occupancy) = active_slot(&masked, samples.len());
                let mut indicator = vec![0u8; width];
                indicator[slot] = 1;

                samples.push(ExplodedSample {
                    stay_date: row.stay_date,
                    indicator,
                    occupancy,
                });
            }
        }

        log::debug!(
            "Exploded {} dates into {} single-room samples",
            table.len(),
            samples.len()
        );
        samples
    }

    /// Samples active for one room type, in date order
    pub fn select(
        samples: &[ExplodedSample],
        room_types: &[RoomTypeId],
        room_type: RoomTypeId,
    ) -> Vec<ExplodedSample> {
        let Some(slot) = room_types.iter().position(|r| *r == room_type) else {
            return Vec::new();
        };
        samples
            .iter()
            .filter(|s| s.indicator.get(slot) == Some(&1))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineConfig;

    fn table(rows: Vec<Vec<u32>>) -> OccupancyTable {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        OccupancyTable::from_rows(
            PipelineConfig::default().room_types(),
            rows.into_iter()
                .enumerate()
                .map(|(i, counts)| (start + chrono::Duration::days(i as i64), counts))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_active_indicator_per_sample() {
        let samples = RoomTypeExploder::explode(&table(vec![
            vec![3, 0, 1, 0, 0, 0, 0, 2],
            vec![0; 8],
        ]));
        assert_eq!(samples.len(), 16);
        for sample in &samples {
            assert_eq!(sample.indicator.iter().filter(|v| **v == 1).count(), 1);
        }
    }

    #[test]
    fn test_each_slot_carries_its_own_count() {
        let samples = RoomTypeExploder::explode(&table(vec![vec![3, 0, 1, 0, 0, 0, 0, 2]]));
        let targets: Vec<(usize, u32)> = samples
            .iter()
            .map(|s| (s.active_slot(), s.occupancy))
            .collect();
        assert_eq!(
            targets,
            vec![(0, 3), (1, 0), (2, 1), (3, 0), (4, 0), (5, 0), (6, 0), (7, 2)]
        );
    }

    #[test]
    fn test_all_zero_row_falls_back_to_row_index() {
        let samples = RoomTypeExploder::explode(&table(vec![vec![1; 8], vec![0; 8]]));
        for (i, sample) in samples.iter().enumerate().skip(8) {
            assert_eq!(sample.active_slot(), i % 8);
            assert_eq!(sample.occupancy, 0);
        }
    }

    #[test]
    fn test_active_slot_picks_first_nonzero() {
        assert_eq!(active_slot(&[0, 4, 2], 10), (1, 4));
        assert_eq!(active_slot(&[0, 0, 0], 10), (1, 0));
    }

    #[test]
    fn test_select_gives_one_row_per_date() {
        let samples = RoomTypeExploder::explode(&table(vec![
            vec![3, 0, 1, 0, 0, 0, 0, 2],
            vec![0; 8],
            vec![0, 0, 0, 0, 0, 0, 0, 9],
        ]));
        let room_types = PipelineConfig::default().room_types();
        let eleven = RoomTypeExploder::select(&samples, &room_types, RoomTypeId(11));
        let occupancy: Vec<u32> = eleven.iter().map(|s| s.occupancy).collect();
        assert_eq!(occupancy, vec![2, 0, 9]);

        assert!(RoomTypeExploder::select(&samples, &room_types, RoomTypeId(42)).is_empty());
    }
}
