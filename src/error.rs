//! Error types for contact tracking and callsign resolution
//!
//! Every variant here is an expected outcome that the caller can log or
//! ignore. Nothing in the store treats these as fatal.

use std::time::SystemTime;

use thiserror::Error;

/// Errors raised by a single trackfile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The sample is not newer than the latest one already recorded
    #[error("stale update: sample at {rejected:?} is not newer than {latest:?}")]
    StaleUpdate {
        latest: SystemTime,
        rejected: SystemTime,
    },
}

/// Errors raised by the contact database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    /// No entry for the requested ID or callsign/coalition pair
    #[error("contact not found")]
    NotFound,
    /// More than one candidate matched equally well
    #[error("callsign matched more than one contact")]
    Ambiguous,
    /// A trackfile rejected an out-of-order sample
    #[error("stale update for contact {id}: sample at {rejected:?} is not newer than {latest:?}")]
    StaleUpdate {
        id: u64,
        latest: SystemTime,
        rejected: SystemTime,
    },
}

impl ContactError {
    pub(crate) fn from_track(id: u64, err: TrackError) -> Self {
        match err {
            TrackError::StaleUpdate { latest, rejected } => ContactError::StaleUpdate {
                id,
                latest,
                rejected,
            },
        }
    }

    /// True for outcomes a caller should report as "no such contact"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContactError::NotFound | ContactError::Ambiguous)
    }
}
