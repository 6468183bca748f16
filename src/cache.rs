//! Change notifications and the read cache that listens to them.
//!
//! The repository publishes an `Invalidation` on the `ChangeNotifier` after
//! each successful mutation. `QueryCache` subscribes to those events and
//! evicts matching entries. Pending events are drained at the start of every
//! cache read, so a read issued after a mutation has returned never sees an
//! entry older than that mutation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::models::Note;

const CHANNEL_CAPACITY: usize = 256;

/// Identifies a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The list of all the user's notes.
    Notes,
    /// A single note by id.
    Note(String),
}

/// "This read result for this user is stale."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub user_id: String,
    pub key: QueryKey,
}

#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<Invalidation>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.tx.subscribe()
    }

    pub fn invalidate(&self, user_id: &str, key: QueryKey) {
        tracing::debug!(user_id, ?key, "Invalidating cached query");
        // No subscribers just means nothing is cached.
        let _ = self.tx.send(Invalidation {
            user_id: user_id.to_string(),
            key,
        });
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Cached {
    List(Vec<Note>),
    One(Note),
}

type CacheKey = (String, QueryKey);

/// Upper bound on cached reads across all users.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
struct Entry {
    value: Cached,
    /// Insertion order, used to pick the oldest entry to evict.
    seq: u64,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<CacheKey, Entry>,
    next_seq: u64,
    /// Bumped every time an invalidation is applied.
    generation: u64,
}

/// Per-user read cache for note lists and single notes.
///
/// A read that misses takes `generation()` before fetching and hands it back
/// when storing. If any invalidation was applied in between, the fetched
/// value may predate a write and is dropped instead of cached.
pub struct QueryCache {
    entries: Mutex<Entries>,
    changes: Mutex<broadcast::Receiver<Invalidation>>,
    capacity: usize,
}

impl QueryCache {
    pub fn new(changes: broadcast::Receiver<Invalidation>) -> Self {
        Self::with_capacity(changes, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(changes: broadcast::Receiver<Invalidation>, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            changes: Mutex::new(changes),
            capacity: capacity.max(1),
        }
    }

    /// Apply every invalidation published so far and return the guarded
    /// entries.
    fn synced(&self) -> MutexGuard<'_, Entries> {
        let mut rx = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            match rx.try_recv() {
                Ok(Invalidation { user_id, key }) => {
                    entries.map.remove(&(user_id, key));
                    entries.generation += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Cache fell behind invalidations, clearing");
                    entries.map.clear();
                    entries.generation += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        entries
    }

    /// Apply every invalidation published so far.
    pub fn sync(&self) {
        drop(self.synced());
    }

    /// Current generation. Take it before fetching a value to cache.
    pub fn generation(&self) -> u64 {
        self.synced().generation
    }

    pub fn list(&self, user_id: &str) -> Option<Vec<Note>> {
        let entries = self.synced();
        match entries.map.get(&(user_id.to_string(), QueryKey::Notes)) {
            Some(Entry { value: Cached::List(notes), .. }) => Some(notes.clone()),
            _ => None,
        }
    }

    /// Cache a fetched list unless an invalidation landed since `generation`.
    pub fn store_list(&self, user_id: &str, notes: &[Note], generation: u64) {
        self.insert(
            (user_id.to_string(), QueryKey::Notes),
            Cached::List(notes.to_vec()),
            generation,
        );
    }

    pub fn note(&self, user_id: &str, id: &str) -> Option<Note> {
        let entries = self.synced();
        match entries.map.get(&(user_id.to_string(), QueryKey::Note(id.to_string()))) {
            Some(Entry { value: Cached::One(note), .. }) => Some(note.clone()),
            _ => None,
        }
    }

    /// Cache a fetched note unless an invalidation landed since `generation`.
    pub fn store_note(&self, user_id: &str, note: &Note, generation: u64) {
        self.insert(
            (user_id.to_string(), QueryKey::Note(note.id.clone())),
            Cached::One(note.clone()),
            generation,
        );
    }

    fn insert(&self, key: CacheKey, value: Cached, generation: u64) {
        let mut entries = self.synced();
        if entries.generation != generation {
            tracing::debug!(user_id = %key.0, key = ?key.1, "Dropping read that raced a write");
            return;
        }

        if !entries.map.contains_key(&key) && entries.map.len() >= self.capacity {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.map.remove(&oldest);
            }
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(key, Entry { value, seq });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.synced().map.len()
    }
}
