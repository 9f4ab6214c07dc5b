//! radar-contacts: live contact tracking with spoken callsign lookup
//!
//!  Keeps the latest state of every entity reported by a telemetry feed and
//!  resolves noisy, transcribed callsigns ("houston one one") to the tracked
//!  entity they most likely refer to ("Hussein 1-1"), never crossing
//!  coalitions and never guessing between equally good matches.

pub mod callsign;
pub mod coalition;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod history;
pub mod matcher;
pub mod trackfile;

pub use coalition::Coalition;
pub use database::{ContactDatabase, Resolution, Values};
pub use error::{ContactError, TrackError};
pub use matcher::MatchPolicy;
pub use trackfile::{Contact, Frame, Point, Trackfile};
