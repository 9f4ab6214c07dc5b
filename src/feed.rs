//! Telemetry feed ingestion
//!
//!  Reads JSON-lines telemetry events, hands them over a channel and applies
//!  them to the contact database. One line per event:
//!
//!  ```text
//!  {"type":"observe","id":1,"name":"Mobius 1 Reaper","coalition":"blue","platform":"F-15C","time":1700000000.0,"lat":42.1,"lon":41.7,"altitude":24000,"heading":270}
//!  {"type":"remove","id":1}
//!  {"type":"reset"}
//!  ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::coalition::Coalition;
use crate::database::ContactDatabase;
use crate::error::ContactError;
use crate::trackfile::{Contact, Frame, Point, Trackfile};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed event: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp: {0}")]
    InvalidTime(f64),
}

/// One telemetry sample for an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub name: String,
    pub coalition: Coalition,
    #[serde(default)]
    pub platform: String,
    /// Seconds since the Unix epoch
    pub time: f64,
    pub lat: f64,
    pub lon: f64,
    /// Feet
    #[serde(default)]
    pub altitude: f64,
    /// Degrees true
    #[serde(default)]
    pub heading: f64,
}

impl Observation {
    pub fn contact(&self) -> Contact {
        Contact::new(self.id, &self.name, self.coalition, &self.platform)
    }

    pub fn frame(&self) -> Result<Frame, FeedError> {
        let time = Duration::try_from_secs_f64(self.time)
            .ok()
            .and_then(|offset| UNIX_EPOCH.checked_add(offset))
            .ok_or(FeedError::InvalidTime(self.time))?;
        Ok(Frame {
            time,
            point: Point::new(self.lon, self.lat),
            altitude: self.altitude,
            heading: self.heading,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedEvent {
    Observe(Observation),
    Remove { id: u64 },
    Reset,
}

/// Parse one feed line. Blank lines yield `None`.
pub fn parse_event(line: &str) -> Result<Option<FeedEvent>, FeedError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read events from `reader` and send them down `tx`.
///
/// Returns the number of malformed lines skipped. Stops early if the
/// receiving side has hung up.
pub fn read_events<R: BufRead>(reader: R, tx: &Sender<FeedEvent>) -> std::io::Result<u64> {
    let mut malformed = 0;
    for line in reader.lines() {
        let line = line?;
        match parse_event(&line) {
            Ok(Some(event)) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Skipping feed line: {}", e);
                malformed += 1;
            }
        }
    }
    Ok(malformed)
}

/// Read events from a file, or stdin when `filename` is `-`
pub fn read_file(filename: &str, tx: &Sender<FeedEvent>) -> std::io::Result<u64> {
    let file: Box<dyn Read> = if filename == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(File::open(filename)?)
    };
    read_events(BufReader::new(file), tx)
}

/// Counters kept while applying events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub observations: u64,
    pub created: u64,
    pub stale: u64,
    pub invalid: u64,
    pub removed: u64,
    pub resets: u64,
}

/// Applies feed events to a shared database
pub struct Ingestor {
    db: Arc<ContactDatabase>,
    history_capacity: usize,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(db: Arc<ContactDatabase>, history_capacity: usize) -> Self {
        Self {
            db,
            history_capacity,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Apply one event. Rejected samples are counted and logged, not fatal.
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Observe(obs) => {
                self.stats.observations += 1;
                if let Err(e) = self.observe(&obs) {
                    debug!("Dropped sample for contact {}: {}", obs.id, e);
                }
            }
            FeedEvent::Remove { id } => {
                if self.db.delete(id) {
                    self.stats.removed += 1;
                }
            }
            FeedEvent::Reset => {
                info!("Feed reset, dropping {} contacts", self.db.len());
                self.db.reset();
                self.stats.resets += 1;
            }
        }
    }

    fn observe(&mut self, obs: &Observation) -> Result<(), IngestError> {
        let frame = obs.frame().inspect_err(|_| self.stats.invalid += 1)?;
        let contact = obs.contact();

        // Labels are fixed per trackfile, a renamed entity starts a new one
        let known = self
            .db
            .get_by_id(obs.id)
            .is_some_and(|tf| *tf.contact() == contact);
        if known {
            self.db.update(obs.id, frame).inspect_err(|e| {
                if matches!(e, ContactError::StaleUpdate { .. }) {
                    self.stats.stale += 1;
                }
            })?;
            return Ok(());
        }

        let mut trackfile = Trackfile::with_capacity(contact, self.history_capacity);
        trackfile
            .update(frame)
            .map_err(|e| ContactError::from_track(obs.id, e))?;
        debug!("New contact {} '{}' ({})", obs.id, obs.name, obs.coalition);
        self.db.set(trackfile);
        self.stats.created += 1;
        Ok(())
    }
}

#[derive(Debug, Error)]
enum IngestError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Contact(#[from] ContactError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    const MOBIUS: &str = r#"{"type":"observe","id":1,"name":"Mobius 1 Reaper","coalition":"blue","platform":"F-15C","time":100.0,"lat":42.0,"lon":41.0,"altitude":24000,"heading":270}"#;

    fn observe(id: u64, name: &str, time: f64) -> FeedEvent {
        FeedEvent::Observe(Observation {
            id,
            name: name.to_string(),
            coalition: Coalition::Blue,
            platform: "F-16C".to_string(),
            time,
            lat: 42.0,
            lon: 41.0,
            altitude: 20000.0,
            heading: 90.0,
        })
    }

    #[test]
    fn test_parse_event() {
        let event = parse_event(MOBIUS).unwrap().unwrap();
        let FeedEvent::Observe(obs) = event else {
            panic!("expected observation");
        };
        assert_eq!(obs.id, 1);
        assert_eq!(obs.coalition, Coalition::Blue);
        assert_eq!(obs.frame().unwrap().time, UNIX_EPOCH + Duration::from_secs(100));

        assert_eq!(
            parse_event(r#"{"type":"remove","id":3}"#).unwrap(),
            Some(FeedEvent::Remove { id: 3 })
        );
        assert_eq!(parse_event(r#"{"type":"reset"}"#).unwrap(), Some(FeedEvent::Reset));
        assert_eq!(parse_event("   ").unwrap(), None);
        assert!(parse_event("{not json").is_err());
        assert!(parse_event(r#"{"type":"explode"}"#).is_err());
    }

    #[test]
    fn test_optional_fields_default() {
        let line = r#"{"type":"observe","id":9,"name":"Uzi 1","coalition":"red","time":1.5,"lat":0,"lon":0}"#;
        let Some(FeedEvent::Observe(obs)) = parse_event(line).unwrap() else {
            panic!("expected observation");
        };
        assert_eq!(obs.platform, "");
        assert_eq!(obs.altitude, 0.0);
    }

    #[test]
    fn test_invalid_time() {
        let Some(FeedEvent::Observe(mut obs)) = parse_event(MOBIUS).unwrap() else {
            panic!("expected observation");
        };
        obs.time = -1.0;
        assert!(matches!(obs.frame(), Err(FeedError::InvalidTime(_))));
        obs.time = f64::NAN;
        assert!(matches!(obs.frame(), Err(FeedError::InvalidTime(_))));
    }

    #[test]
    fn test_time_past_clock_range() {
        let event = observe(1, "Mobius 1 Reaper", 1.7e19);
        let FeedEvent::Observe(obs) = &event else {
            panic!("expected observation");
        };
        assert!(matches!(obs.frame(), Err(FeedError::InvalidTime(t)) if t == 1.7e19));

        let db = Arc::new(ContactDatabase::new());
        let mut ingestor = Ingestor::new(Arc::clone(&db), 4);
        ingestor.apply(event);
        assert_eq!(ingestor.stats().invalid, 1);

        // Ingestion carries on after the bad sample
        ingestor.apply(observe(1, "Mobius 1 Reaper", 100.0));
        assert!(db.get_by_id(1).unwrap().last_known().is_some());
    }

    #[test]
    fn test_read_events() {
        let input = format!("{MOBIUS}\n\ngarbage\n{{\"type\":\"remove\",\"id\":1}}\n");
        let (tx, rx) = unbounded();
        let malformed = read_events(input.as_bytes(), &tx).unwrap();
        drop(tx);

        assert_eq!(malformed, 1);
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], FeedEvent::Remove { id: 1 });
    }

    #[test]
    fn test_ingestor_creates_and_updates() {
        let db = Arc::new(ContactDatabase::new());
        let mut ingestor = Ingestor::new(Arc::clone(&db), 4);

        ingestor.apply(observe(1, "Hussein 1-1 | SpyderF16", 10.0));
        ingestor.apply(observe(1, "Hussein 1-1 | SpyderF16", 20.0));
        ingestor.apply(observe(1, "Hussein 1-1 | SpyderF16", 15.0));

        let tf = db.get_by_id(1).unwrap();
        assert_eq!(tf.frames().count(), 2);
        assert_eq!(tf.history_capacity(), 4);
        assert_eq!(
            ingestor.stats(),
            IngestStats {
                observations: 3,
                created: 1,
                stale: 1,
                ..IngestStats::default()
            }
        );

        let (callsign, found) = db
            .get_by_callsign_and_coalition("houston 1 1", Coalition::Blue)
            .unwrap();
        assert_eq!(callsign, "hussein 1 1");
        assert_eq!(found.contact().id(), 1);
    }

    #[test]
    fn test_ingestor_rename_starts_new_trackfile() {
        let db = Arc::new(ContactDatabase::new());
        let mut ingestor = Ingestor::new(Arc::clone(&db), 4);

        ingestor.apply(observe(1, "Colt 1-1", 10.0));
        ingestor.apply(observe(1, "Colt 1-2", 20.0));

        let tf = db.get_by_id(1).unwrap();
        assert_eq!(tf.contact().callsign(), Some("colt 1 2"));
        assert_eq!(tf.frames().count(), 1);
        assert!(db
            .get_by_callsign_and_coalition("colt 1 1", Coalition::Blue)
            .is_none());
    }

    #[test]
    fn test_ingestor_remove_and_reset() {
        let db = Arc::new(ContactDatabase::new());
        let mut ingestor = Ingestor::new(Arc::clone(&db), 4);

        ingestor.apply(observe(1, "Colt 1-1", 10.0));
        ingestor.apply(observe(2, "Colt 1-2", 10.0));
        ingestor.apply(FeedEvent::Remove { id: 1 });
        ingestor.apply(FeedEvent::Remove { id: 1 });
        assert_eq!(db.len(), 1);

        ingestor.apply(FeedEvent::Reset);
        assert!(db.is_empty());

        let stats = ingestor.stats();
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.resets, 1);
    }
}
