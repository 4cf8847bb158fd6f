//! Session domain module.
//!
//! Who is logged in at the kiosk, how they got there, and the timetable
//! that came with the login.
//!
//! Both login paths (REST form submission and pushed card-scan frame) carry
//! the same `LoginPayload`; `Session::from_login` is the single place that
//! turns it into a `Session`, which keeps the two paths indistinguishable.

mod aggregate;
mod demo;
mod errors;
mod payload;
mod restore;
mod status;
mod timetable;

pub use aggregate::{LoginNotice, LoginSource, Session, SessionUser};
pub use demo::demo_events;
pub use errors::AuthError;
pub use payload::{LoginPayload, LoginUser, StoredTokens};
pub use restore::{RestoreOutcome, RestorePolicy};
pub use status::SessionStatus;
pub use timetable::{Course, RoomRef, TimetableEvent};
