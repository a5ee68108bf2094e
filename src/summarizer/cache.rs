use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::summarizer::SummaryOptions;

/// SHA-256 over the transcript and the options that shape its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(transcript: &str, options: &SummaryOptions) -> Self {
        let mut hasher = Sha256::new();
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update((transcript.len() as u64).to_le_bytes());
        hasher.update(transcript.as_bytes());
        hasher.update(options.length.as_str().as_bytes());
        hasher.update([u8::from(options.action_items)]);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Bounded summary cache with insertion-order eviction.
///
/// Lookups do not refresh an entry's position; the oldest insert is always
/// the next to go.
pub struct SummaryCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    order: VecDeque<Fingerprint>,
}

impl SummaryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// Store a summary and evict oldest entries while over capacity.
    ///
    /// Replacing an existing key keeps its original position. Returns the
    /// number of evicted entries.
    pub fn insert(&self, key: Fingerprint, summary: String) -> usize {
        let entry = CacheEntry {
            summary,
            created_at: Utc::now(),
        };

        let mut inner = self.lock();
        if inner.entries.insert(key, entry).is_none() {
            inner.order.push_back(key);
        }

        let mut evicted = 0;
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            evicted += 1;
        }
        evicted
    }
}
