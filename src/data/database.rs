//! SQLite reservation store
//!
//! Holds the currently uploaded reservation dataset. Row ids preserve
//! insertion order, which the warm-up skip depends on.

use crate::{
    LumenError, ReservationRecord, ReservationStatus, Result, RoomTypeId, REQUIRED_COLUMNS,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        db.verify_schema(&path.display().to_string())?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reservations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stay_date TEXT NOT NULL,
                room_category_id INTEGER NOT NULL,
                room_cnt INTEGER NOT NULL,
                reservation_status TEXT NOT NULL,
                cancel_date TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_reservations_stay_date ON reservations(stay_date);
            "#,
        )?;
        Ok(())
    }

    /// A database created elsewhere may carry a reservations table with a
    /// different shape; reject it before reading.
    fn verify_schema(&self, origin: &str) -> Result<()> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(reservations)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for required in REQUIRED_COLUMNS {
            if !columns.iter().any(|c| c == required) {
                return Err(LumenError::MissingColumn {
                    origin: origin.to_string(),
                    column: required.to_string(),
                });
            }
        }
        Ok(())
    }

    // ==================== Reservation Operations ====================

    /// Append reservations in order inside one transaction
    pub fn insert_reservations(&mut self, records: &[ReservationRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO reservations (stay_date, room_category_id, room_cnt, reservation_status, cancel_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.stay_date.format("%Y-%m-%d").to_string(),
                    record.room_category_id.0,
                    record.room_cnt,
                    record.reservation_status.label(),
                    record.cancel_date.map(|d| d.format("%Y-%m-%d").to_string()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Swap the stored dataset for a new upload
    pub fn replace_reservations(&mut self, records: &[ReservationRecord]) -> Result<usize> {
        self.clear_reservations()?;
        self.insert_reservations(records)
    }

    pub fn clear_reservations(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM reservations", [])?)
    }

    /// All reservations in insertion order
    pub fn get_all_reservations(&self) -> Result<Vec<ReservationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT stay_date, room_category_id, room_cnt, reservation_status, cancel_date
             FROM reservations
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], Self::row_to_reservation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn row_to_reservation(row: &Row<'_>) -> rusqlite::Result<ReservationRecord> {
        let stay_date: String = row.get(0)?;
        let cancel_date: Option<String> = row.get(4)?;
        let status: String = row.get(3)?;

        Ok(ReservationRecord {
            stay_date: parse_stored_date(&stay_date, 0)?,
            room_category_id: RoomTypeId(row.get(1)?),
            room_cnt: row.get(2)?,
            reservation_status: ReservationStatus::from_label(&status),
            cancel_date: cancel_date
                .filter(|s| !s.is_empty())
                .map(|s| parse_stored_date(&s, 4))
                .transpose()?,
        })
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let reservation_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reservations", [], |row| row.get(0))?;

        let cancelled_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reservations WHERE reservation_status IN ('Cancelled', 'No-show')",
            [],
            |row| row.get(0),
        )?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(stay_date) FROM reservations", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(stay_date) FROM reservations", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            reservation_count: reservation_count as usize,
            cancelled_count: cancelled_count as usize,
            earliest_stay: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_stay: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

fn parse_stored_date(value: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub reservation_count: usize,
    pub cancelled_count: usize,
    pub earliest_stay: Option<NaiveDate>,
    pub latest_stay: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(day: u32, room: u32, status: &str, cancel: Option<u32>) -> ReservationRecord {
        ReservationRecord {
            stay_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            room_category_id: RoomTypeId(room),
            room_cnt: 1,
            reservation_status: ReservationStatus::from_label(status),
            cancel_date: cancel.and_then(|d| NaiveDate::from_ymd_opt(2024, 5, d)),
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.reservation_count, 0);
        assert!(stats.earliest_stay.is_none());
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut db = Database::in_memory().unwrap();
        let records = vec![
            make_record(9, 1, "Checked-out", None),
            make_record(2, 11, "Cancelled", Some(20)),
            make_record(5, 3, "No-show", None),
        ];
        assert_eq!(db.insert_reservations(&records).unwrap(), 3);

        let loaded = db.get_all_reservations().unwrap();
        assert_eq!(loaded, records);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.reservation_count, 3);
        assert_eq!(stats.cancelled_count, 2);
        assert_eq!(stats.earliest_stay, NaiveDate::from_ymd_opt(2024, 6, 2));
        assert_eq!(stats.latest_stay, NaiveDate::from_ymd_opt(2024, 6, 9));
    }

    #[test]
    fn test_replace_discards_previous_upload() {
        let mut db = Database::in_memory().unwrap();
        db.insert_reservations(&[make_record(1, 1, "Checked-out", None)]).unwrap();
        db.replace_reservations(&[make_record(3, 2, "Checked-out", None)]).unwrap();

        let loaded = db.get_all_reservations().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].room_category_id, RoomTypeId(2));
    }

    #[test]
    fn test_foreign_table_missing_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE reservations (id INTEGER PRIMARY KEY, stay_date TEXT, room_cnt INTEGER);",
            )
            .unwrap();
        }

        match Database::open(&path) {
            Err(LumenError::MissingColumn { column, .. }) => assert_eq!(column, "room_category_id"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected schema error"),
        }
    }
}
