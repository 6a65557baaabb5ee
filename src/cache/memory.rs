use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
struct Entry {
    payload: String,
    expires_at: Instant,
    tags: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    tags: HashMap<String, HashSet<String>>,
}

impl Inner {
    fn remove_entry(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            for tag in entry.tags {
                if let Some(keys) = self.tags.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tags.remove(&tag);
                    }
                }
            }
        }
    }
}

/// In-process cache of serialized values with per-entry TTL and a tag index
/// for group invalidation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<Inner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.get_raw_at(key, Instant::now())
    }

    fn get_raw_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.payload.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.remove_entry(key);
        }
        None
    }

    pub fn set_raw(&self, key: &str, payload: String, ttl: Duration, tags: &[String]) {
        let mut inner = self.inner.lock();
        inner.remove_entry(key);
        for tag in tags {
            inner
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        inner.entries.insert(
            key.to_string(),
            Entry {
                payload,
                expires_at: Instant::now() + ttl,
                tags: tags.to_vec(),
            },
        );
    }

    /// Removes every entry carrying `tag` and returns how many were dropped.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .tags
            .remove(tag)
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default();
        for key in &keys {
            inner.remove_entry(key);
        }
        keys.len()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.remove_entry(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
