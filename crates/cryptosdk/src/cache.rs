//! Bounded in-memory cache of key material, keyed by key name.
//!
//! Eviction is FIFO: once the cache is full, inserting a new name drops the
//! entry that was inserted earliest, regardless of how recently it was read.
//!
//! The cache holds no lock of its own. It lives inside
//! [`SessionState`](crate::session::SessionState) and every call is made
//! under that lock.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use common::SdkError;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default number of entries a cache holds.
pub const DEFAULT_CAPACITY: usize = 10;

/// Longest key name stored, in characters. Longer names are truncated.
pub const MAX_KEY_NAME_LEN: usize = 128;

/// Largest key material accepted, in bytes.
pub const MAX_KEY_DATA_LEN: usize = 256;

/// One cached key. Name and material are zeroed when the entry is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyCacheEntry {
    name: String,
    material: Vec<u8>,
}

impl KeyCacheEntry {
    /// Stored (possibly truncated) key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the key material.
    pub fn material(&self) -> &[u8] {
        &self.material
    }

    /// Length of the key material in bytes.
    pub fn len(&self) -> usize {
        self.material.len()
    }

    /// Returns `true` if the material is empty.
    pub fn is_empty(&self) -> bool {
        self.material.is_empty()
    }
}

impl fmt::Debug for KeyCacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCacheEntry")
            .field("name", &self.name)
            .field("material", &"[REDACTED]")
            .field("len", &self.material.len())
            .finish()
    }
}

/// Truncate `name` to [`MAX_KEY_NAME_LEN`] characters.
///
/// Applied to both inserts and lookups so a long name still finds its entry.
pub fn normalize_name(name: &str) -> &str {
    match name.char_indices().nth(MAX_KEY_NAME_LEN) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// FIFO-evicting key cache with hashed lookup.
///
/// `order` records insertion order; `entries` holds the material. Both
/// always contain exactly the same set of names.
#[derive(Debug)]
pub struct KeyCache {
    capacity: usize,
    entries: HashMap<String, KeyCacheEntry>,
    order: VecDeque<String>,
}

impl KeyCache {
    /// Create an empty cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by exact (normalised) name.
    pub fn lookup(&self, name: &str) -> Option<&KeyCacheEntry> {
        self.entries.get(normalize_name(name))
    }

    /// Cache `material` under `name`.
    ///
    /// Re-inserting an existing name replaces its material and moves it to
    /// the back of the eviction order. Inserting a new name into a full cache
    /// first evicts the earliest-inserted entry.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BufferTooSmall`] if `material` is longer than
    /// [`MAX_KEY_DATA_LEN`]; the cache is left unchanged.
    pub fn insert(&mut self, name: &str, material: &[u8]) -> Result<(), SdkError> {
        if material.len() > MAX_KEY_DATA_LEN {
            return Err(SdkError::BufferTooSmall {
                required: material.len(),
            });
        }
        let name = normalize_name(name);

        if !self.invalidate(name) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.entries.insert(
            name.to_owned(),
            KeyCacheEntry {
                name: name.to_owned(),
                material: material.to_vec(),
            },
        );
        self.order.push_back(name.to_owned());
        Ok(())
    }

    /// Remove and zero the entry for `name`. Returns `true` if one existed.
    ///
    /// The eviction order is compacted, so the freed slot is reused.
    pub fn invalidate(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        let Some((key, _entry)) = self.entries.remove_entry(name) else {
            return false;
        };
        scrub(key);
        if let Some(queued) = self
            .order
            .iter()
            .position(|n| n == name)
            .and_then(|pos| self.order.remove(pos))
        {
            scrub(queued);
        }
        true
    }

    /// Zero and remove every entry.
    pub fn clear(&mut self) {
        self.entries.drain().for_each(|(key, _entry)| scrub(key));
        self.order.drain(..).for_each(scrub);
    }

    /// Cached names, earliest-inserted first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.order.pop_front() {
            if let Some((key, _entry)) = self.entries.remove_entry(&oldest) {
                scrub(key);
            }
            scrub(oldest);
        }
    }
}

/// Every copy of a key name leaves the cache through here.
fn scrub(mut name: String) {
    name.zeroize();
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
