//! Flat-file feature tables
//!
//! One CSV per room type, `dataset_room_type_<id>.csv`, indexed by
//! `stay_date`. Missing values are written as empty fields.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::data::dataset::{Column, FeatureLayout, FeatureRow, RoomTypeDataset};
use crate::{LumenError, Result, RoomTypeId};

pub fn table_file_name(room_type: RoomTypeId) -> String {
    format!("dataset_room_type_{}.csv", room_type.0)
}

/// Writes per-room-type tables into an output directory
pub struct DatasetWriter {
    output_dir: PathBuf,
    layout: FeatureLayout,
}

impl DatasetWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P, layout: FeatureLayout) -> Self {
        DatasetWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
            layout,
        }
    }

    pub fn path_for(&self, room_type: RoomTypeId) -> PathBuf {
        self.output_dir.join(table_file_name(room_type))
    }

    /// Write every table to a temporary name first and rename them into
    /// place only after all writes succeeded. If a rename fails, tables
    /// already renamed by this call and the remaining staged files are
    /// removed. Tables from an earlier run that were overwritten before the
    /// failure are not restored.
    pub fn write_all(&self, datasets: &[RoomTypeDataset]) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let target = self.path_for(dataset.room_type);
            let temp = target.with_extension("csv.tmp");
            if let Err(e) = self.write_to(dataset, &temp) {
                discard(staged.iter().map(|(temp, _)| temp));
                discard([&temp]);
                return Err(e);
            }
            staged.push((temp, target));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (temp, target)) in staged.iter().enumerate() {
            if let Err(e) = std::fs::rename(temp, target) {
                log::warn!("Failed to commit {}, rolling back", target.display());
                discard(written.iter());
                discard(staged[i..].iter().map(|(temp, _)| temp));
                return Err(e.into());
            }
            written.push(target.clone());
        }
        for path in &written {
            log::info!("Wrote {}", path.display());
        }
        Ok(written)
    }

    pub fn write_to(&self, dataset: &RoomTypeDataset, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.layout.header())?;

        let columns = self.layout.output_columns();
        for row in &dataset.rows {
            let mut record = Vec::with_capacity(columns.len() + 1);
            record.push(row.stay_date.format("%Y-%m-%d").to_string());
            for &column in &columns {
                record.push(format_cell(row, column));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn discard<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}

fn format_cell(row: &FeatureRow, column: Column) -> String {
    match column {
        Column::DayOfWeek => row.day_of_week.to_string(),
        other => row.value(other).map(|v| v.to_string()).unwrap_or_default(),
    }
}

/// Read a written table back into a dataset
pub fn read_dataset<P: AsRef<Path>>(
    path: P,
    room_type: RoomTypeId,
    layout: &FeatureLayout,
) -> Result<RoomTypeDataset> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let mut reader = csv::Reader::from_path(path)?;

    let expected = layout.header();
    let headers = reader.headers()?.clone();
    for name in &expected {
        if !headers.iter().any(|h| h == name) {
            return Err(LumenError::MissingColumn {
                origin: origin.clone(),
                column: name.clone(),
            });
        }
    }
    let position = |name: &str| headers.iter().position(|h| h == name).unwrap_or(0);
    let date_index = position("stay_date");
    let columns: Vec<(Column, usize)> = layout
        .output_columns()
        .into_iter()
        .map(|c| (c, position(&layout.column_name(c))))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let parse_error = |message: String| LumenError::Parse {
            origin: origin.clone(),
            line,
            message,
        };

        let raw_date = record.get(date_index).unwrap_or("");
        let stay_date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| parse_error(format!("invalid stay_date `{}`", raw_date)))?;

        let mut row = FeatureRow::new(stay_date, 0.0);
        row.lags = vec![None; layout.lag_window];
        row.forward = vec![None; layout.forecast_horizon];

        for &(column, index) in &columns {
            let raw = record.get(index).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            if column == Column::DayOfWeek {
                row.day_of_week = raw
                    .parse()
                    .map_err(|_| parse_error(format!("invalid day_of_week `{}`", raw)))?;
                continue;
            }
            let value: f64 = raw.parse().map_err(|_| {
                parse_error(format!("invalid {} `{}`", layout.column_name(column), raw))
            })?;
            row.set_value(column, value);
        }
        rows.push(row);
    }

    Ok(RoomTypeDataset::new(room_type, rows))
}
