//! Contact database
//!
//!  Holds every live trackfile keyed by contact ID, plus a secondary index
//!  from (coalition, normalized callsign) to the IDs flying under that
//!  callsign. Both indexes live behind one reader/writer lock and are changed
//!  together under a single write guard, so a reader never sees one updated
//!  without the other.
//!
//!  Trackfiles are handed out as `Arc`s. Updates replace the stored `Arc`
//!  (copy-on-write when a reader still holds the old one), so a reader only
//!  ever sees complete trackfiles.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::callsign::tokenize;
use crate::coalition::Coalition;
use crate::error::ContactError;
use crate::matcher::{self, MatchOutcome, MatchPolicy};
use crate::trackfile::{Contact, Frame, Trackfile};

/// Secondary index key of a contact
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexKey {
    coalition: Coalition,
    callsign: String,
}

impl IndexKey {
    fn for_contact(contact: &Contact) -> Option<Self> {
        contact.callsign().map(|callsign| Self {
            coalition: contact.coalition(),
            callsign: callsign.to_string(),
        })
    }
}

/// Contacts sharing one normalized callsign within a coalition
#[derive(Debug)]
struct CallsignEntry {
    /// Pre-split tokens of the callsign, used for matching
    tokens: Vec<String>,
    ids: BTreeSet<u64>,
}

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<u64, Arc<Trackfile>>,
    by_callsign: HashMap<Coalition, HashMap<String, CallsignEntry>>,
    /// Reverse of `by_callsign`, used to drop stale entries
    keys: HashMap<u64, IndexKey>,
}

impl Indexes {
    /// Point the secondary index for `id` at `key`, removing any old entry
    fn reindex(&mut self, id: u64, key: Option<IndexKey>) {
        if self.keys.get(&id) == key.as_ref() {
            return;
        }
        self.unindex(id);

        let Some(key) = key else {
            return;
        };
        debug!(
            "Indexing contact {} as '{}' ({})",
            id, key.callsign, key.coalition
        );
        self.by_callsign
            .entry(key.coalition)
            .or_default()
            .entry(key.callsign.clone())
            .or_insert_with(|| CallsignEntry {
                tokens: tokenize(&key.callsign),
                ids: BTreeSet::new(),
            })
            .ids
            .insert(id);
        self.keys.insert(id, key);
    }

    fn unindex(&mut self, id: u64) {
        let Some(key) = self.keys.remove(&id) else {
            return;
        };
        if let Some(bucket) = self.by_callsign.get_mut(&key.coalition) {
            if let Some(entry) = bucket.get_mut(&key.callsign) {
                entry.ids.remove(&id);
                if entry.ids.is_empty() {
                    bucket.remove(&key.callsign);
                }
            }
            if bucket.is_empty() {
                self.by_callsign.remove(&key.coalition);
            }
        }
    }

    /// The contact a callsign entry names. Several contacts under one
    /// callsign are indistinguishable to a caller and resolve to none.
    fn sole(&self, ids: &BTreeSet<u64>) -> Result<Arc<Trackfile>, ContactError> {
        let mut ids = ids.iter();
        match (ids.next(), ids.next()) {
            (Some(id), None) => self.by_id.get(id).cloned().ok_or(ContactError::NotFound),
            (Some(_), Some(_)) => Err(ContactError::Ambiguous),
            (None, _) => Err(ContactError::NotFound),
        }
    }
}

/// A callsign lookup that resolved to a single contact
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Stored canonical callsign, not the phrase that was heard
    pub callsign: String,
    pub trackfile: Arc<Trackfile>,
    /// Match score, 0 for an exact match
    pub score: u32,
}

/// Thread-safe store of live trackfiles
#[derive(Debug, Default)]
pub struct ContactDatabase {
    indexes: RwLock<Indexes>,
    policy: MatchPolicy,
}

impl ContactDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database that resolves callsigns with a custom policy
    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self {
            indexes: RwLock::new(Indexes::default()),
            policy,
        }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Insert or replace the trackfile for its contact ID.
    ///
    /// Returns the trackfile previously stored under that ID.
    pub fn set(&self, trackfile: Trackfile) -> Option<Arc<Trackfile>> {
        let id = trackfile.contact().id();
        let key = IndexKey::for_contact(trackfile.contact());
        let trackfile = Arc::new(trackfile);

        let mut indexes = self.indexes.write();
        indexes.reindex(id, key);
        indexes.by_id.insert(id, trackfile)
    }

    /// Append a sample to a stored trackfile.
    pub fn update(&self, id: u64, frame: Frame) -> Result<Arc<Trackfile>, ContactError> {
        let mut indexes = self.indexes.write();
        let stored = indexes.by_id.get_mut(&id).ok_or(ContactError::NotFound)?;
        Arc::make_mut(stored)
            .update(frame)
            .map_err(|e| ContactError::from_track(id, e))?;
        Ok(Arc::clone(stored))
    }

    pub fn get_by_id(&self, id: u64) -> Option<Arc<Trackfile>> {
        self.indexes.read().by_id.get(&id).cloned()
    }

    /// Resolve a heard phrase to a contact within one coalition.
    ///
    /// Returns the stored canonical callsign with the trackfile. Unknown and
    /// ambiguous phrases both yield `None`.
    pub fn get_by_callsign_and_coalition(
        &self,
        phrase: &str,
        coalition: Coalition,
    ) -> Option<(String, Arc<Trackfile>)> {
        self.resolve(phrase, coalition)
            .ok()
            .map(|r| (r.callsign, r.trackfile))
    }

    /// Like `get_by_callsign_and_coalition`, keeping the failure reason.
    pub fn resolve(&self, phrase: &str, coalition: Coalition) -> Result<Resolution, ContactError> {
        let query = tokenize(phrase);
        let indexes = self.indexes.read();
        let bucket = indexes
            .by_callsign
            .get(&coalition)
            .ok_or(ContactError::NotFound)?;

        let candidates = bucket
            .iter()
            .map(|(callsign, entry)| (entry.tokens.as_slice(), (callsign, entry)));
        match matcher::best_match(&query, candidates, &self.policy) {
            MatchOutcome::Found {
                key: (callsign, entry),
                score,
            } => {
                let trackfile = indexes.sole(&entry.ids).inspect_err(|_| {
                    debug!(
                        "Callsign '{}' ({}) is shared by contacts {:?}",
                        callsign, coalition, entry.ids
                    )
                })?;
                Ok(Resolution {
                    callsign: callsign.clone(),
                    trackfile,
                    score,
                })
            }
            MatchOutcome::Ambiguous { score } => {
                debug!(
                    "Ambiguous callsign '{}' ({}): several matches at score {}",
                    phrase, coalition, score
                );
                Err(ContactError::Ambiguous)
            }
            MatchOutcome::NotFound => Err(ContactError::NotFound),
        }
    }

    /// Remove a contact from both indexes. Returns whether it was present.
    pub fn delete(&self, id: u64) -> bool {
        let mut indexes = self.indexes.write();
        indexes.unindex(id);
        let removed = indexes.by_id.remove(&id).is_some();
        if removed {
            debug!("Removed contact {}", id);
        }
        removed
    }

    /// Drop every contact
    pub fn reset(&self) {
        let mut indexes = self.indexes.write();
        indexes.by_id.clear();
        indexes.by_callsign.clear();
        indexes.keys.clear();
    }

    /// Snapshot of all trackfiles at the time of the call.
    ///
    /// The lock is released before iteration starts; later changes are not
    /// reflected in an iterator that is already running.
    pub fn values(&self) -> Values {
        let snapshot: Vec<_> = self.indexes.read().by_id.values().cloned().collect();
        Values {
            inner: snapshot.into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.indexes.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterator over a snapshot of the database
#[derive(Debug)]
pub struct Values {
    inner: std::vec::IntoIter<Arc<Trackfile>>,
}

impl Iterator for Values {
    type Item = Arc<Trackfile>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Values {}
