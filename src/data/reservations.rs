//! Reservation CSV reader
//!
//! Columns are located by header name, so order does not matter and extra
//! columns (guest, price, channel fields) are ignored.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

use crate::{LumenError, ReservationRecord, ReservationStatus, Result, RoomTypeId, REQUIRED_COLUMNS};

/// Header positions of the required columns
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    stay_date: usize,
    room_category_id: usize,
    room_cnt: usize,
    reservation_status: usize,
    cancel_date: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord, origin: &str) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LumenError::MissingColumn {
                    origin: origin.to_string(),
                    column: name.to_string(),
                })
        };
        let [stay_date, room_category_id, room_cnt, reservation_status, cancel_date] =
            REQUIRED_COLUMNS;
        Ok(ColumnIndex {
            stay_date: find(stay_date)?,
            room_category_id: find(room_category_id)?,
            room_cnt: find(room_cnt)?,
            reservation_status: find(reservation_status)?,
            cancel_date: find(cancel_date)?,
        })
    }
}

/// Reads reservation records from CSV, in file order
pub struct ReservationReader {
    origin: String,
}

impl ReservationReader {
    pub fn new(origin: impl Into<String>) -> Self {
        ReservationReader {
            origin: origin.into(),
        }
    }

    pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Vec<ReservationRecord>> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let records = Self::new(path.display().to_string()).read(file)?;
        log::info!("Read {} reservation rows from {}", records.len(), path.display());
        Ok(records)
    }

    pub fn read<R: Read>(&self, input: R) -> Result<Vec<ReservationRecord>> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
        let index = ColumnIndex::from_headers(reader.headers()?, &self.origin)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(self.parse_row(&row, index)?);
        }
        Ok(records)
    }

    fn parse_row(&self, row: &StringRecord, index: ColumnIndex) -> Result<ReservationRecord> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |i: usize| row.get(i).unwrap_or("");
        let error = |message: String| LumenError::Parse {
            origin: self.origin.clone(),
            line,
            message,
        };

        let stay_date = parse_date(field(index.stay_date))
            .ok_or_else(|| error(format!("invalid stay_date `{}`", field(index.stay_date))))?;
        let room_category_id: u32 = field(index.room_category_id).parse().map_err(|_| {
            error(format!(
                "invalid room_category_id `{}`",
                field(index.room_category_id)
            ))
        })?;
        let room_cnt: u32 = field(index.room_cnt)
            .parse()
            .map_err(|_| error(format!("invalid room_cnt `{}`", field(index.room_cnt))))?;
        let cancel_date = match field(index.cancel_date) {
            "" => None,
            raw => Some(
                parse_date(raw).ok_or_else(|| error(format!("invalid cancel_date `{}`", raw)))?,
            ),
        };

        Ok(ReservationRecord {
            stay_date,
            room_category_id: RoomTypeId(room_category_id),
            room_cnt,
            reservation_status: ReservationStatus::from_label(field(index.reservation_status)),
            cancel_date,
        })
    }
}

/// `YYYY-MM-DD`, or a timestamp whose date part is taken. Timestamps may
/// carry fractional seconds and a UTC offset; the local date is kept.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").map(|d| d.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|d| d.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|d| d.date_naive()))
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z").map(|d| d.date_naive()))
        .ok()
}
