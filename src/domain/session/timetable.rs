//! Timetable events delivered with a login or fetched from `/api/events/`.
//!
//! The bridge does not render these; it carries them to presentation
//! consumers. Fields the backend adds later are kept in `extra` so nothing
//! is lost on the way through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One entry on a student's timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEvent {
    #[serde(default)]
    pub id: JsonValue,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Course>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomRef>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
}

/// Where an event takes place; `number` is the id used for route requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    pub building: String,
    pub number: String,
}

impl RoomRef {
    /// "ENG 340" style label.
    pub fn label(&self) -> String {
        format!("{} {}", self.building, self.number)
    }
}

impl TimetableEvent {
    /// Room number to route to, if the event has a room.
    pub fn route_target(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.number.as_str())
    }
}
