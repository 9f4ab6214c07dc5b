//! Contacts and their trackfiles
//!
//!  A trackfile is the live record of one tracked entity: the immutable
//!  contact labels plus a short history of kinematic samples.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::callsign::parse_pilot_callsign;
use crate::coalition::Coalition;
use crate::error::TrackError;
use crate::history::History;

/// Samples kept per trackfile unless configured otherwise
pub const DEFAULT_HISTORY_CAPACITY: usize = 8;

const EARTH_RADIUS_KM: f64 = 6371.0;
const KM_TO_NM: f64 = 0.539957;

/// Identity labels of a tracked entity, fixed when first observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// Unique ID assigned by the telemetry source
    id: u64,
    /// Raw name as reported
    name: String,
    coalition: Coalition,
    /// Airframe or platform type, e.g. "F-15C"
    platform: String,
    /// Pilot callsign parsed from `name`, if any
    callsign: Option<String>,
}

impl Contact {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        coalition: Coalition,
        platform: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let callsign = parse_pilot_callsign(&name);
        Self {
            id,
            name,
            coalition,
            platform: platform.into(),
            callsign,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coalition(&self) -> Coalition {
        self.coalition
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Normalized pilot callsign, `None` when the name is not parseable
    pub fn callsign(&self) -> Option<&str> {
        self.callsign.as_deref()
    }
}

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A single timestamped kinematic sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: SystemTime,
    pub point: Point,
    /// Altitude in feet
    pub altitude: f64,
    /// Heading in degrees true
    pub heading: f64,
}

/// Live record of one tracked entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trackfile {
    contact: Contact,
    history: History<Frame>,
}

impl Trackfile {
    pub fn new(contact: Contact) -> Self {
        Self::with_capacity(contact, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a trackfile retaining at most `capacity` samples
    pub fn with_capacity(contact: Contact, capacity: usize) -> Self {
        Self {
            contact,
            history: History::with_capacity(capacity),
        }
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Record a new sample.
    ///
    /// Samples that are not strictly newer than the latest one are rejected
    /// and leave the trackfile unchanged.
    pub fn update(&mut self, frame: Frame) -> Result<(), TrackError> {
        if let Some(latest) = self.history.latest() {
            if frame.time <= latest.time {
                return Err(TrackError::StaleUpdate {
                    latest: latest.time,
                    rejected: frame.time,
                });
            }
        }
        self.history.push(frame);
        Ok(())
    }

    /// Most recent sample
    pub fn last_known(&self) -> Option<&Frame> {
        self.history.latest()
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        self.last_known().map(|f| f.time)
    }

    /// Retained samples from oldest to newest
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = &Frame> {
        self.history.iter()
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Ground speed in knots over the two most recent samples
    pub fn speed_knots(&self) -> Option<f64> {
        let (prev, latest) = self.last_two()?;
        let elapsed = latest.time.duration_since(prev.time).ok()?.as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let (distance_km, _) = distance_bearing(prev.point, latest.point);
        Some(distance_km * KM_TO_NM / (elapsed / 3600.0))
    }

    /// True course in degrees over the two most recent samples
    pub fn course(&self) -> Option<f64> {
        let (prev, latest) = self.last_two()?;
        if prev.point == latest.point {
            return None;
        }
        let (_, bearing) = distance_bearing(prev.point, latest.point);
        Some(bearing)
    }

    fn last_two(&self) -> Option<(&Frame, &Frame)> {
        let mut newest_first = self.history.iter().rev();
        let latest = newest_first.next()?;
        let prev = newest_first.next()?;
        Some((prev, latest))
    }
}

/// Distance (km) and initial bearing (degrees) between two points
/// using the Haversine formula
fn distance_bearing(from: Point, to: Point) -> (f64, f64) {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    let distance = EARTH_RADIUS_KM * c;

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();
    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;

    (distance, bearing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn frame(secs: u64, lon: f64, lat: f64) -> Frame {
        Frame {
            time: UNIX_EPOCH + Duration::from_secs(secs),
            point: Point::new(lon, lat),
            altitude: 20000.0,
            heading: 90.0,
        }
    }

    fn mobius() -> Trackfile {
        Trackfile::new(Contact::new(1, "Mobius 1 Reaper", Coalition::Blue, "F-15C"))
    }

    #[test]
    fn test_contact_new() {
        let c = Contact::new(7, "Hussein 1-1 | SpyderF16", Coalition::Blue, "F-16C");
        assert_eq!(c.id(), 7);
        assert_eq!(c.name(), "Hussein 1-1 | SpyderF16");
        assert_eq!(c.callsign(), Some("hussein 1 1"));
        assert_eq!(c.coalition(), Coalition::Blue);
        assert_eq!(c.platform(), "F-16C");

        let unparsed = Contact::new(8, "Tanker", Coalition::Blue, "KC-135");
        assert_eq!(unparsed.callsign(), None);
    }

    #[test]
    fn test_new_trackfile_is_empty() {
        let tf = mobius();
        assert!(tf.last_known().is_none());
        assert!(tf.last_seen().is_none());
        assert_eq!(tf.history_capacity(), DEFAULT_HISTORY_CAPACITY);
        assert!(tf.speed_knots().is_none());
    }

    #[test]
    fn test_update_replaces_latest() {
        let mut tf = mobius();
        tf.update(frame(10, 0.0, 0.0)).unwrap();
        tf.update(frame(20, 0.1, 0.0)).unwrap();
        assert_eq!(tf.last_known(), Some(&frame(20, 0.1, 0.0)));
        assert_eq!(tf.frames().count(), 2);
    }

    #[test]
    fn test_stale_update_rejected() {
        let mut tf = mobius();
        tf.update(frame(20, 0.0, 0.0)).unwrap();

        let err = tf.update(frame(10, 1.0, 1.0)).unwrap_err();
        assert_eq!(
            err,
            TrackError::StaleUpdate {
                latest: UNIX_EPOCH + Duration::from_secs(20),
                rejected: UNIX_EPOCH + Duration::from_secs(10),
            }
        );
        // Equal timestamps are not newer either
        assert!(tf.update(frame(20, 1.0, 1.0)).is_err());
        assert_eq!(tf.last_known(), Some(&frame(20, 0.0, 0.0)));
        assert_eq!(tf.frames().count(), 1);
    }

    #[test]
    fn test_history_bounded() {
        let mut tf = Trackfile::with_capacity(
            Contact::new(2, "Yellow 13 Reiher", Coalition::Red, "Su-27"),
            3,
        );
        for i in 1..=10 {
            tf.update(frame(i, 0.0, 0.0)).unwrap();
        }
        let times: Vec<_> = tf.frames().map(|f| f.time).collect();
        assert_eq!(
            times,
            vec![
                UNIX_EPOCH + Duration::from_secs(8),
                UNIX_EPOCH + Duration::from_secs(9),
                UNIX_EPOCH + Duration::from_secs(10),
            ]
        );
    }

    #[test]
    fn test_speed_and_course() {
        let mut tf = mobius();
        // One degree of latitude is 60 nm; flown due north in one hour
        tf.update(frame(0, 0.0, 0.0)).unwrap();
        tf.update(frame(3600, 0.0, 1.0)).unwrap();

        let speed = tf.speed_knots().unwrap();
        assert!((speed - 60.0).abs() < 0.1, "speed was {speed}");
        let course = tf.course().unwrap();
        assert!(course.abs() < 0.01, "course was {course}");
    }

    #[test]
    fn test_course_east() {
        let mut tf = mobius();
        tf.update(frame(0, 0.0, 0.0)).unwrap();
        tf.update(frame(60, 0.1, 0.0)).unwrap();
        let course = tf.course().unwrap();
        assert!((course - 90.0).abs() < 0.01, "course was {course}");
    }

    #[test]
    fn test_course_stationary() {
        let mut tf = mobius();
        tf.update(frame(0, 0.0, 0.0)).unwrap();
        tf.update(frame(60, 0.0, 0.0)).unwrap();
        assert!(tf.course().is_none());
        assert_eq!(tf.speed_knots(), Some(0.0));
    }
}
