//! Event calendar input
//!
//! Two JSON documents: a list of named events with their date ranges, and a
//! mapping from room type id to the event names that affect it.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::data::reservations::parse_date;
use crate::{LumenError, Result, RoomTypeId};

/// Inclusive date range of one event occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRange {
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,
}

impl EventRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.finish_date
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    name: String,
    #[serde(rename = "date")]
    ranges: Vec<RawRange>,
}

#[derive(Debug, Deserialize)]
struct RawRange {
    start_date: String,
    finish_date: String,
}

/// Named events and the room types they apply to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCalendar {
    events: HashMap<String, Vec<EventRange>>,
    assignments: HashMap<RoomTypeId, Vec<String>>,
}

impl EventCalendar {
    /// Load from `events.json` and the room type assignment file
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(events_path: P, assignments_path: Q) -> Result<Self> {
        let events = read_file(events_path.as_ref())?;
        let assignments = read_file(assignments_path.as_ref())?;
        Self::from_json(&events, &assignments)
    }

    pub fn from_json(events_json: &str, assignments_json: &str) -> Result<Self> {
        let raw_events: Vec<RawEvent> = serde_json::from_str(events_json)
            .map_err(|e| LumenError::Events(format!("Malformed events file: {}", e)))?;
        let raw_assignments: HashMap<String, Vec<String>> = serde_json::from_str(assignments_json)
            .map_err(|e| LumenError::Events(format!("Malformed assignment file: {}", e)))?;

        let mut events: HashMap<String, Vec<EventRange>> = HashMap::new();
        for event in raw_events {
            let mut ranges = Vec::with_capacity(event.ranges.len());
            for range in &event.ranges {
                let start_date = parse_event_date(&range.start_date)?;
                let finish_date = parse_event_date(&range.finish_date)?;
                ranges.push(EventRange {
                    start_date,
                    finish_date,
                });
            }
            events.entry(event.name).or_default().extend(ranges);
        }

        let mut assignments = HashMap::new();
        for (key, names) in raw_assignments {
            let id: u32 = key.trim().parse().map_err(|_| {
                LumenError::Events(format!("Room type key `{}` is not an integer", key))
            })?;
            assignments.insert(RoomTypeId(id), names);
        }

        Ok(EventCalendar {
            events,
            assignments,
        })
    }

    /// Ranges of a named event; empty if the name is unknown
    pub fn ranges(&self, name: &str) -> &[EventRange] {
        self.events.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// Event names assigned to a room type
    pub fn events_for(&self, room_type: RoomTypeId) -> Result<&[String]> {
        self.assignments
            .get(&room_type)
            .map(Vec::as_slice)
            .ok_or_else(|| LumenError::Events(format!("No event assignment for {}", room_type)))
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| LumenError::Events(format!("Failed to read {}: {}", path.display(), e)))
}

/// `YYYY-MM-DD`, optionally followed by a time which is dropped
pub fn parse_event_date(value: &str) -> Result<NaiveDate> {
    parse_date(value).ok_or_else(|| LumenError::Events(format!("Invalid event date `{}`", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"[
        {"name": "Ski Cup", "date": [
            {"start_date": "2024-01-10", "finish_date": "2024-01-12"},
            {"start_date": "2024-02-01T00:00:00.000", "finish_date": "2024-02-01T00:00:00+00:00"}
        ]},
        {"name": "Jazz Days", "date": [
            {"start_date": "2024-01-11", "finish_date": "2024-01-15"}
        ]}
    ]"#;

    const ASSIGNMENTS: &str = r#"{"1": ["Ski Cup", "Jazz Days"], "11": []}"#;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn test_parse_calendar() {
        let calendar = EventCalendar::from_json(EVENTS, ASSIGNMENTS).unwrap();
        assert_eq!(calendar.ranges("Ski Cup").len(), 2);
        assert_eq!(calendar.ranges("Ski Cup")[1].start_date, d(2, 1));
        assert_eq!(calendar.ranges("Ski Cup")[1].finish_date, d(2, 1));
        assert!(calendar.ranges("Unknown").is_empty());
        assert_eq!(calendar.events_for(RoomTypeId(1)).unwrap().len(), 2);
        assert!(calendar.events_for(RoomTypeId(11)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_assignment_is_an_error() {
        let calendar = EventCalendar::from_json(EVENTS, ASSIGNMENTS).unwrap();
        assert!(matches!(
            calendar.events_for(RoomTypeId(3)),
            Err(LumenError::Events(_))
        ));
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = EventRange {
            start_date: d(1, 10),
            finish_date: d(1, 12),
        };
        assert!(range.contains(d(1, 10)));
        assert!(range.contains(d(1, 12)));
        assert!(!range.contains(d(1, 13)));
        assert!(!range.contains(d(1, 9)));
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(EventCalendar::from_json("{", ASSIGNMENTS).is_err());
        assert!(EventCalendar::from_json(EVENTS, r#"{"one": []}"#).is_err());
        let bad_date = r#"[{"name": "x", "date": [{"start_date": "10/01/2024", "finish_date": "2024-01-12"}]}]"#;
        assert!(EventCalendar::from_json(bad_date, ASSIGNMENTS).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EventCalendar::load(dir.path().join("events.json"), dir.path().join("sep.json"));
        assert!(matches!(result, Err(LumenError::Events(_))));
    }
}
