//! Fixed timetable shown when the kiosk runs against a local API with no
//! stored session.

use serde_json::{json, Map};

use super::{Course, RoomRef, TimetableEvent};
use crate::domain::foundation::Timestamp;

/// The two demo events, timed relative to `now`.
pub fn demo_events(now: Timestamp) -> Vec<TimetableEvent> {
    vec![
        TimetableEvent {
            id: json!(1),
            title: "ENGGEN205 Lecture".to_string(),
            event_type: "class".to_string(),
            course: Some(Course {
                code: "ENGGEN205".to_string(),
                name: "Engineering Mechanics".to_string(),
            }),
            room: Some(RoomRef {
                building: "ENG".to_string(),
                number: "340".to_string(),
            }),
            start_time: now.to_rfc3339(),
            end_time: now.plus_secs(3_600).to_rfc3339(),
            lecturer: Some("Dr. Smith".to_string()),
            description: None,
            is_urgent: false,
            extra: Map::new(),
        },
        TimetableEvent {
            id: json!(2),
            title: "STATS100 Mid-term Exam".to_string(),
            event_type: "exam".to_string(),
            course: Some(Course {
                code: "STATS100".to_string(),
                name: "Statistics".to_string(),
            }),
            room: Some(RoomRef {
                building: "ENG".to_string(),
                number: "401".to_string(),
            }),
            start_time: now.plus_secs(86_400).to_rfc3339(),
            end_time: now.plus_secs(86_400 + 7_200).to_rfc3339(),
            lecturer: Some("N/A".to_string()),
            description: None,
            is_urgent: true,
            extra: Map::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_dataset_has_two_named_events() {
        let events = demo_events(Timestamp::now());
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["ENGGEN205 Lecture", "STATS100 Mid-term Exam"]);
    }

    #[test]
    fn exam_is_urgent_and_tomorrow() {
        let now = Timestamp::now();
        let events = demo_events(now);
        assert!(events[1].is_urgent);
        assert_eq!(events[1].start_time, now.plus_secs(86_400).to_rfc3339());
    }
}
