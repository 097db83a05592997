//! Weekday and month averages, and weekday importance ranks
//!
//! Computed once per run from the occupancy matrix and read-only afterwards.

use chrono::Datelike;

use crate::features::occupancy::OccupancyTable;

/// Per-room-type seasonal lookups
#[derive(Debug, Clone, PartialEq)]
pub struct RankTables {
    /// `weekday_avg[weekday][slot]`, weekday 0 = Monday
    weekday_avg: Vec<Vec<Option<f64>>>,
    /// `month_avg[month - 1][slot]`
    month_avg: Vec<Vec<Option<f64>>>,
    /// `ranked_days[weekday][slot]`
    ranked_days: Vec<Vec<Option<f64>>>,
}

impl RankTables {
    pub fn from_table(table: &OccupancyTable) -> Self {
        let width = table.room_types().len();
        let mut weekday_sum = vec![vec![0.0f64; width]; 7];
        let mut weekday_n = [0usize; 7];
        let mut month_sum = vec![vec![0.0f64; width]; 12];
        let mut month_n = [0usize; 12];

        for row in table.rows() {
            let weekday = row.stay_date.weekday().num_days_from_monday() as usize;
            let month = row.stay_date.month0() as usize;
            weekday_n[weekday] += 1;
            month_n[month] += 1;
            for (slot, count) in row.counts.iter().enumerate() {
                weekday_sum[weekday][slot] += *count as f64;
                month_sum[month][slot] += *count as f64;
            }
        }

        let weekday_avg = averages(&weekday_sum, &weekday_n);
        let month_avg = averages(&month_sum, &month_n);

        let mut ranked_days = vec![vec![None; width]; 7];
        for slot in 0..width {
            let column: Vec<Option<f64>> = weekday_avg.iter().map(|w| w[slot]).collect();
            for (weekday, rank) in rank_min(&column).into_iter().enumerate() {
                ranked_days[weekday][slot] = rank;
            }
        }

        RankTables {
            weekday_avg,
            month_avg,
            ranked_days,
        }
    }

    pub fn weekday_avg(&self, weekday: u32, slot: usize) -> Option<f64> {
        self.weekday_avg.get(weekday as usize)?.get(slot).copied().flatten()
    }

    pub fn month_avg(&self, month: u32, slot: usize) -> Option<f64> {
        let index = (month as usize).checked_sub(1)?;
        self.month_avg.get(index)?.get(slot).copied().flatten()
    }

    pub fn weekday_rank(&self, weekday: u32, slot: usize) -> Option<f64> {
        self.ranked_days.get(weekday as usize)?.get(slot).copied().flatten()
    }
}

fn averages(sums: &[Vec<f64>], counts: &[usize]) -> Vec<Vec<Option<f64>>> {
    sums.iter()
        .zip(counts)
        .map(|(row, n)| {
            row.iter()
                .map(|s| if *n == 0 { None } else { Some(s / *n as f64) })
                .collect()
        })
        .collect()
}

/// Ascending ranks starting at 1; ties share the lowest rank of the group.
/// Missing values stay unranked.
pub fn rank_min(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|value| {
            value.map(|v| {
                let below = values.iter().flatten().filter(|other| **other < v).count();
                (below + 1) as f64
            })
        })
        .collect()
}
