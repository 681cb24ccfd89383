// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stable ID registry: a process-wide paged-identity pool that gives every
//! table element a handle that survives swap-removes and migrations.
//!
//! Pages are modeled as fixed-size chunks pushed into a `Vec`, so existing
//! mappings never move when the pool grows — only new pages are appended.
//! This stands in for the original's pointer-stable `PagedVector`; since this
//! crate forbids `unsafe` code, handles reference mappings by index rather
//! than by raw pointer.

use std::fmt;

use thiserror::Error;

/// Table index component of a stable handle.
pub type TableIndex = u16;
/// Element-within-table index component of a stable handle.
pub type ElementIndex = u32;
/// Database index component of a stable handle.
pub type DatabaseIndex = u8;
/// Version counter; bumps every time a mapping slot is invalidated.
pub type StableVersion = u8;

const INVALID_ELEMENT: ElementIndex = ElementIndex::MAX;
const PAGE_SIZE: usize = 4096;

/// Where a stable handle currently points: a specific element of a specific
/// table (and, nominally, database — this workspace only ever has one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLocation {
    /// Index of the table the element lives in.
    pub table_index: TableIndex,
    /// Index of the element within that table.
    pub element_index: ElementIndex,
    /// Index of the owning database.
    pub db_index: DatabaseIndex,
}

impl ElementLocation {
    /// True unless the element index is the invalid sentinel.
    pub fn is_valid(&self) -> bool {
        self.element_index != INVALID_ELEMENT
    }

    /// Same table/database, different element index — used when an
    /// element's slot within its table changes (e.g. after a swap-remove).
    pub fn remake_element(&self, element_index: ElementIndex) -> Self {
        Self {
            element_index,
            ..*self
        }
    }
}

impl Default for ElementLocation {
    fn default() -> Self {
        Self {
            table_index: 0,
            element_index: INVALID_ELEMENT,
            db_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Mapping {
    location: ElementLocation,
    version: StableVersion,
}

impl Mapping {
    fn invalidate(&mut self) {
        self.location.element_index = INVALID_ELEMENT;
        self.version = self.version.wrapping_add(1);
    }
}

/// A pointer-stable index into the pool, handed out by
/// [`StableIdPool::create_key`]. Does not itself carry a version — combine
/// with [`Ref`] for a handle that can detect staleness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StableKey(usize);

impl Default for StableKey {
    /// A sentinel key matching no pool slot. Written into vacated row slots
    /// during compaction; never looked up afterwards.
    fn default() -> Self {
        StableKey(usize::MAX)
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StableKey({})", self.0)
    }
}

/// A versioned reference to a pool slot. Dereferences to the current
/// location only while the pool's stored version still matches the version
/// captured when the `Ref` was made — once the slot is erased and reused,
/// the version no longer matches and the `Ref` reads as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ref {
    key: StableKey,
    expected_version: StableVersion,
}

impl Ref {
    /// The underlying pool key, ignoring version.
    pub fn key(&self) -> StableKey {
        self.key
    }

    /// The version this reference expects the slot to still be at.
    pub fn expected_version(&self) -> StableVersion {
        self.expected_version
    }
}

/// Errors a stable ID registry operation can produce.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StableIdError {
    /// The pool has exhausted its reserved capacity and growing further
    /// would invalidate pointer/index stability guarantees.
    #[error("stable id pool exhausted its reserved capacity of {reserved}")]
    PoolExhausted {
        /// The capacity the pool was constructed with.
        reserved: usize,
    },
}

/// Process-wide table of `(location, version)` mappings, addressed by
/// [`StableKey`].
///
/// Reads (`try_get`) take no lock: callers are expected to uphold the same
/// discipline as the original — no table mutation runs concurrently with a
/// read of that table's mappings. Writes go through `&mut self`, so in
/// practice the borrow checker enforces exclusivity for a single-threaded
/// owner; multi-threaded callers wrap a `StableIdPool` in their own mutex at
/// the table-scheduling granularity rather than per-operation here.
#[derive(Debug)]
pub struct StableIdPool {
    pages: Vec<Vec<Mapping>>,
    reserved: usize,
    len: usize,
    free_list: Vec<usize>,
}

impl StableIdPool {
    /// Creates a pool reserving room for `reserved` mappings up front.
    pub fn new(reserved: usize) -> Self {
        Self {
            pages: Vec::new(),
            reserved,
            len: 0,
            free_list: Vec::new(),
        }
    }

    /// Number of live (non-free) mappings.
    pub fn len(&self) -> usize {
        self.len - self.free_list.len()
    }

    /// True if the pool holds no live mappings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn page_for(&self, raw: usize) -> (usize, usize) {
        (raw / PAGE_SIZE, raw % PAGE_SIZE)
    }

    fn get_mapping(&self, raw: usize) -> Option<&Mapping> {
        let (page, offset) = self.page_for(raw);
        self.pages.get(page).and_then(|p| p.get(offset))
    }

    fn get_mapping_mut(&mut self, raw: usize) -> Option<&mut Mapping> {
        let (page, offset) = self.page_for(raw);
        self.pages.get_mut(page).and_then(|p| p.get_mut(offset))
    }

    fn push_raw(&mut self) -> Result<usize, StableIdError> {
        if self.len >= self.reserved {
            return Err(StableIdError::PoolExhausted {
                reserved: self.reserved,
            });
        }
        let raw = self.len;
        let (page, offset) = self.page_for(raw);
        if page == self.pages.len() {
            self.pages.push(Vec::with_capacity(PAGE_SIZE));
        }
        self.pages[page].push(Mapping::default());
        debug_assert_eq!(self.pages[page].len() - 1, offset);
        self.len += 1;
        Ok(raw)
    }

    /// Allocates a fresh key, popping from the free list if one is
    /// available, else growing the pool. The key's mapping starts invalid
    /// and must be populated with [`StableIdPool::insert_key`].
    pub fn create_key(&mut self) -> Result<StableKey, StableIdError> {
        if let Some(raw) = self.free_list.pop() {
            return Ok(StableKey(raw));
        }
        let raw = self.push_raw()?;
        Ok(StableKey(raw))
    }

    /// Writes `location` into `key`'s mapping, preserving the existing
    /// version (used right after `create_key`, or to repoint an existing,
    /// still-valid key).
    pub fn insert_key(&mut self, key: StableKey, location: ElementLocation) {
        if let Some(mapping) = self.get_mapping_mut(key.0) {
            mapping.location = location;
        }
    }

    /// Updates the location a `Ref` points to, preserving version. No-op if
    /// the reference is stale.
    pub fn update_key(&mut self, r: Ref, location: ElementLocation) {
        if let Some(mapping) = self.get_mapping_mut(r.key.0) {
            if mapping.version == r.expected_version {
                mapping.location = location;
            }
        }
    }

    /// Invalidates `key`'s mapping, bumps its version, and returns the slot
    /// to the free list.
    pub fn erase_key(&mut self, key: StableKey) {
        if let Some(mapping) = self.get_mapping_mut(key.0) {
            mapping.invalidate();
            self.free_list.push(key.0);
        }
    }

    /// Reads the current location for `key`, if the slot is still valid.
    pub fn try_get(&self, key: StableKey) -> Option<ElementLocation> {
        self.get_mapping(key.0)
            .filter(|m| m.location.is_valid())
            .map(|m| m.location)
    }

    /// Builds a versioned [`Ref`] to `key`'s current slot.
    pub fn make_ref(&self, key: StableKey) -> Ref {
        let version = self.get_mapping(key.0).map_or(0, |m| m.version);
        Ref {
            key,
            expected_version: version,
        }
    }

    /// Dereferences `r`, returning the current location only if the pool's
    /// stored version for that slot still matches what `r` expects.
    pub fn try_deref(&self, r: Ref) -> Option<ElementLocation> {
        let mapping = self.get_mapping(r.key.0)?;
        if mapping.version != r.expected_version || !mapping.location.is_valid() {
            return None;
        }
        Some(mapping.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(table: TableIndex, element: ElementIndex) -> ElementLocation {
        ElementLocation {
            table_index: table,
            element_index: element,
            db_index: 0,
        }
    }

    #[test]
    fn create_insert_and_lookup() {
        let mut pool = StableIdPool::new(16);
        let key = pool.create_key().unwrap();
        pool.insert_key(key, loc(0, 5));
        assert_eq!(pool.try_get(key), Some(loc(0, 5)));
    }

    #[test]
    fn erase_invalidates_and_bumps_version() {
        let mut pool = StableIdPool::new(16);
        let key = pool.create_key().unwrap();
        pool.insert_key(key, loc(0, 1));
        let r = pool.make_ref(key);
        assert!(pool.try_deref(r).is_some());
        pool.erase_key(key);
        assert!(pool.try_get(key).is_none());
        assert!(pool.try_deref(r).is_none());
    }

    #[test]
    fn erased_slot_is_reused_with_bumped_version() {
        let mut pool = StableIdPool::new(16);
        let key = pool.create_key().unwrap();
        pool.insert_key(key, loc(0, 1));
        let stale_ref = pool.make_ref(key);
        pool.erase_key(key);
        let reused = pool.create_key().unwrap();
        assert_eq!(reused, key);
        pool.insert_key(reused, loc(0, 1));
        assert!(pool.try_deref(stale_ref).is_none());
        assert!(pool.try_get(reused).is_some());
    }

    #[test]
    fn pool_exhaustion_is_an_error() {
        let mut pool = StableIdPool::new(1);
        pool.create_key().unwrap();
        assert_eq!(
            pool.create_key(),
            Err(StableIdError::PoolExhausted { reserved: 1 })
        );
    }

    #[test]
    fn update_key_respects_version() {
        let mut pool = StableIdPool::new(4);
        let key = pool.create_key().unwrap();
        pool.insert_key(key, loc(0, 0));
        let r = pool.make_ref(key);
        pool.erase_key(key);
        pool.update_key(r, loc(0, 99));
        let reused = pool.create_key().unwrap();
        pool.insert_key(reused, loc(0, 0));
        assert_eq!(pool.try_get(reused), Some(loc(0, 0)));
    }
}
