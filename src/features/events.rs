//! Event intensity overlay

use crate::data::dataset::RoomTypeDataset;
use crate::data::events::EventCalendar;
use crate::Result;

/// Adds one to `event` for every applicable event range covering a row's date
pub struct EventOverlay<'a> {
    calendar: &'a EventCalendar,
}

impl<'a> EventOverlay<'a> {
    pub fn new(calendar: &'a EventCalendar) -> Self {
        EventOverlay { calendar }
    }

    pub fn apply(&self, mut dataset: RoomTypeDataset) -> Result<RoomTypeDataset> {
        let names = self.calendar.events_for(dataset.room_type)?;
        let mut hits = 0usize;

        for name in names {
            if !self.calendar.has_event(name) {
                log::warn!("Event `{}` assigned to {} is not in the calendar", name, dataset.room_type);
                continue;
            }
            for range in self.calendar.ranges(name) {
                for row in dataset.rows.iter_mut().filter(|r| range.contains(r.stay_date)) {
                    row.event += 1.0;
                    hits += 1;
                }
            }
        }

        log::debug!(
            "{}: {} events, {} event-days marked",
            dataset.room_type,
            names.len(),
            hits
        );
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::FeatureRow;
    use crate::{LumenError, RoomTypeId};
    use chrono::NaiveDate;

    fn dataset(room: u32, days: u32) -> RoomTypeDataset {
        RoomTypeDataset::new(
            RoomTypeId(room),
            (1..=days)
                .map(|d| FeatureRow::new(NaiveDate::from_ymd_opt(2024, 3, d).unwrap(), 0.0))
                .collect(),
        )
    }

    fn calendar() -> EventCalendar {
        EventCalendar::from_json(
            r#"[
                {"name": "Fair", "date": [
                    {"start_date": "2024-03-02", "finish_date": "2024-03-04"},
                    {"start_date": "2024-03-04", "finish_date": "2024-03-05"}
                ]},
                {"name": "Race", "date": [{"start_date": "2024-03-03", "finish_date": "2024-03-03"}]},
                {"name": "Expo", "date": [{"start_date": "2024-03-01", "finish_date": "2024-03-09"}]}
            ]"#,
            r#"{"1": ["Fair", "Race", "Ghost"], "2": ["Expo"], "3": []}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_overlapping_events_accumulate() {
        let calendar = calendar();
        let result = EventOverlay::new(&calendar).apply(dataset(1, 6)).unwrap();
        let events: Vec<f64> = result.rows.iter().map(|r| r.event).collect();
        assert_eq!(events, vec![0.0, 1.0, 2.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_events_only_apply_to_assigned_room() {
        let calendar = calendar();
        let overlay = EventOverlay::new(&calendar);
        let room2 = overlay.apply(dataset(2, 4)).unwrap();
        assert!(room2.rows.iter().all(|r| r.event == 1.0));
        let room3 = overlay.apply(dataset(3, 4)).unwrap();
        assert!(room3.rows.iter().all(|r| r.event == 0.0));
    }

    #[test]
    fn test_unassigned_room_is_fatal() {
        let calendar = calendar();
        let result = EventOverlay::new(&calendar).apply(dataset(7, 2));
        assert!(matches!(result, Err(LumenError::Events(_))));
    }
}
