//! The single-threaded intern table.
//!
//! An open-addressed hash table with chained buckets over a parallel entry
//! array, sized to a prime. Freed slots are threaded onto a free list through
//! the same `next` field that forms the bucket chains. When bounded, the
//! table keeps itself under `max_count` by evicting approximate-LRU victims
//! chosen through the churn pool.

use crate::churn::{ChurnPool, OfferOutcome};
use crate::error::{TableError, TableResult};
use crate::hash::{self, PrecomputedHash};
use crate::primes;
use crate::string::CanonStr;

mod entry;

use entry::{Entry, CHAIN_END};

/// Chain length walked by a single insertion beyond which the table assumes
/// collision abuse and flips to the keyed hash.
const CHAIN_ABUSE_LIMIT: usize = 100;

/// Aggressiveness of a trim pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimLevel {
  Minor,
  Medium,
  Major,
}

impl TrimLevel {
  /// Level for the given collection ordinal, cycling minor, medium, major.
  pub fn cycle(ordinal: u64) -> TrimLevel {
    match ordinal % 3 {
      0 => TrimLevel::Minor,
      1 => TrimLevel::Medium,
      _ => TrimLevel::Major,
    }
  }
}

/// Configuration for an [`InternTable`].
///
/// # Examples
/// ```
/// use canon_core::table::InternTableBuilder;
///
/// let table = InternTableBuilder::new()
///   .capacity(64)
///   .max_count(1_000)
///   .max_length(640)
///   .build()
///   .unwrap();
///
/// assert_eq!(table.count(), 0);
/// assert_eq!(table.max_count(), 1_000);
/// ```
pub struct InternTableBuilder {
  capacity: usize,
  max_count: usize,
  max_length: usize,
}

impl InternTableBuilder {
  pub fn new() -> InternTableBuilder {
    InternTableBuilder {
      capacity: 0,
      max_count: usize::MAX,
      max_length: i32::MAX as usize,
    }
  }

  /// Initial capacity; the table rounds it up to a prime.
  pub fn capacity(mut self, capacity: usize) -> InternTableBuilder {
    self.capacity = capacity;
    self
  }

  /// Most live entries the table will hold before evicting.
  pub fn max_count(mut self, max_count: usize) -> InternTableBuilder {
    self.max_count = max_count;
    self
  }

  /// Longest candidate, in bytes, the table will store.
  pub fn max_length(mut self, max_length: usize) -> InternTableBuilder {
    self.max_length = max_length;
    self
  }

  pub fn build(self) -> TableResult<InternTable> {
    if self.max_count == 0 {
      return Err(TableError::InvalidMaxCount);
    }
    if self.max_length == 0 || self.max_length > i32::MAX as usize {
      return Err(TableError::InvalidMaxLength);
    }
    if self.capacity > i32::MAX as usize {
      return Err(TableError::InvalidCapacity);
    }

    let mut table = InternTable {
      buckets: vec![],
      entries: vec![],
      multiplier: 0,
      slots_used: 0,
      free_head: CHAIN_END,
      free_count: 0,
      current_use: 0,
      added: 0,
      evicted: 0,
      last_victim: 0,
      max_count: self.max_count,
      max_length: self.max_length,
      randomized: false,
      churn: ChurnPool::new(),
    };

    if self.capacity > 0 {
      table.rebuild(primes::next_prime(self.capacity));
    }

    Ok(table)
  }
}

impl Default for InternTableBuilder {
  fn default() -> InternTableBuilder {
    InternTableBuilder::new()
  }
}

/// A deduplicating cache of immutable strings.
///
/// Equal candidates presented between evictions receive the same stored
/// [`CanonStr`] handle. The table is not synchronized; a shared pool wraps
/// one table per shard behind a mutex.
///
/// # Examples
/// ```
/// use canon_core::table::InternTable;
///
/// let mut table = InternTable::new();
/// let first = table.intern("chorus").unwrap();
/// let second = table.intern("chorus").unwrap();
///
/// assert!(first.same(&second));
/// assert_eq!(table.count(), 1);
/// assert_eq!(table.deduped(), 1);
/// ```
pub struct InternTable {
  buckets: Vec<i32>,
  entries: Vec<Entry>,
  multiplier: u64,
  slots_used: i32,
  free_head: i32,
  free_count: i32,
  current_use: i64,
  added: i64,
  evicted: i64,
  last_victim: i64,
  max_count: usize,
  max_length: usize,
  randomized: bool,
  churn: ChurnPool,
}

impl InternTable {
  /// An unbounded table with deferred allocation.
  pub fn new() -> InternTable {
    InternTableBuilder::new()
      .build()
      .expect("default configuration is valid")
  }

  /// Live entries currently stored.
  pub fn count(&self) -> usize {
    (self.slots_used - self.free_count) as usize
  }

  /// Candidates presented over the table's lifetime.
  pub fn considered(&self) -> i64 {
    self.current_use / 2
  }

  /// Entries ever added.
  pub fn added(&self) -> i64 {
    self.added
  }

  /// Entries removed by capacity eviction or trim.
  pub fn evicted(&self) -> i64 {
    self.evicted
  }

  /// Presentations satisfied without adding an entry.
  pub fn deduped(&self) -> i64 {
    self.considered() - self.added
  }

  /// Size of the backing arrays.
  pub fn capacity(&self) -> usize {
    self.buckets.len()
  }

  pub fn max_count(&self) -> usize {
    self.max_count
  }

  pub fn max_length(&self) -> usize {
    self.max_length
  }

  /// Has the table flipped to the keyed hash?
  pub fn is_randomized(&self) -> bool {
    self.randomized
  }

  /// Return the canonical instance for `candidate`, storing it first if
  /// absent. Empty candidates yield the canonical empty string and
  /// over-length candidates a fresh unshared instance; neither occupies a
  /// slot.
  pub fn intern(&mut self, candidate: &str) -> TableResult<CanonStr> {
    self.current_use += 2;

    if let Some(short) = self.short_circuit(candidate) {
      return Ok(short);
    }

    let hash = self.hash_bytes(candidate.as_bytes());
    self.intern_at(candidate, hash)
  }

  /// [`InternTable::intern`] with a hash computed outside the caller's
  /// critical section. A stale mode snapshot is detected and recomputed.
  pub fn intern_hashed(
    &mut self,
    candidate: &str,
    hash: PrecomputedHash,
  ) -> TableResult<CanonStr> {
    self.current_use += 2;

    if let Some(short) = self.short_circuit(candidate) {
      return Ok(short);
    }

    let hash = if hash.is_randomized() == self.randomized {
      hash.value()
    } else {
      self.hash_bytes(candidate.as_bytes())
    };

    self.intern_at(candidate, hash)
  }

  /// Is `candidate` currently stored?
  pub fn contains(&self, candidate: &str) -> TableResult<bool> {
    if candidate.is_empty() || candidate.len() > self.max_length {
      return Ok(false);
    }

    Ok(self.find(candidate)?.is_some())
  }

  /// Drop `candidate` if stored.
  pub fn remove(&mut self, candidate: &str) -> TableResult<bool> {
    if candidate.is_empty() || candidate.len() > self.max_length {
      return Ok(false);
    }

    match self.find(candidate)? {
      Some(index) => {
        let stamp = self.entries[index].last_use;
        if stamp < 0 {
          self.churn.remove(-stamp);
        }
        self.detach_index(index);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Stored values in unspecified order.
  pub fn entries(&self) -> impl Iterator<Item = CanonStr> + '_ {
    self.entries[..self.slots_used as usize]
      .iter()
      .filter(|entry| !entry.is_free())
      .map(|entry| entry.value.clone())
  }

  /// Evict entries whose last use is too old for the level. Minor leaves
  /// multi-use entries alone entirely; major treats both generations alike.
  pub fn trim(&mut self, level: TrimLevel) {
    let count = self.count() as i64;
    let (max_gen0, max_gen1) = match level {
      TrimLevel::Minor => ((count + count / 2) * 2, i64::MAX),
      TrimLevel::Medium => (count * 2, count * 4),
      TrimLevel::Major => (count * 2, count * 2),
    };

    let current_use = self.current_use;
    let dropped = self.retain_entries(|entry| {
      let stamp = entry.last_use;
      stamp >= 0
        && if stamp & 1 == 0 {
          current_use - stamp <= max_gen0
        } else {
          current_use - stamp <= max_gen1
        }
    });

    self.evicted += dropped;
    self.churn.clear();
  }

  /// Grow the backing arrays to hold at least `capacity` entries.
  pub fn ensure_capacity(&mut self, capacity: usize) -> TableResult<()> {
    if capacity > i32::MAX as usize {
      return Err(TableError::InvalidCapacity);
    }

    let target = primes::next_prime(capacity);
    if target > self.buckets.len() {
      self.rebuild(target);
    }

    Ok(())
  }

  /// Shrink the backing arrays to the next prime holding the live entries.
  pub fn trim_excess(&mut self) {
    self.retain_entries(|_| true);

    let target = primes::next_prime(self.count().max(1));
    if target < self.buckets.len() {
      self.rebuild(target);
    }
  }

  /// Drop every entry. Cumulative counters survive.
  pub fn clear(&mut self) {
    for bucket in self.buckets.iter_mut() {
      *bucket = 0;
    }
    for entry in self.entries.iter_mut().take(self.slots_used as usize) {
      *entry = Entry::unused();
    }

    self.slots_used = 0;
    self.free_head = CHAIN_END;
    self.free_count = 0;
    self.last_victim = 0;
    self.churn.clear();
  }

  fn short_circuit(&self, candidate: &str) -> Option<CanonStr> {
    if candidate.is_empty() {
      return Some(CanonStr::empty());
    }
    if candidate.len() > self.max_length {
      return Some(CanonStr::new(candidate));
    }

    None
  }

  fn intern_at(&mut self, candidate: &str, mut hash: u32) -> TableResult<CanonStr> {
    if !self.buckets.is_empty() {
      let mut walked = 0usize;
      let mut cursor = self.bucket_head(hash);

      while cursor != CHAIN_END {
        let entry = &self.entries[cursor as usize];
        if entry.hash == hash && entry.value.as_str() == candidate {
          return Ok(self.refresh(cursor as usize));
        }

        cursor = entry.next;
        walked += 1;
        if walked > self.buckets.len() {
          return Err(TableError::ConcurrentModification);
        }
      }

      if walked > CHAIN_ABUSE_LIMIT && !self.randomized {
        self.adopt_randomized();
        hash = hash::randomized(candidate.as_bytes(), hash::process_seed());
      }
    }

    Ok(self.add(candidate, hash))
  }

  /// Update a hit entry's stamp: pulled out of the churn pool if tracked,
  /// promoted to the multi-use generation either way.
  fn refresh(&mut self, index: usize) -> CanonStr {
    let stamp = self.entries[index].last_use;
    if stamp < 0 {
      self.churn.remove(-stamp);
    }

    self.entries[index].last_use = self.current_use | 1;
    self.entries[index].value.clone()
  }

  fn add(&mut self, candidate: &str, hash: u32) -> CanonStr {
    if self.count() + 1 > self.max_count {
      self.evict_one();
    }

    let index = match self.take_free_slot() {
      Some(index) => index,
      None => {
        if self.slots_used as usize == self.buckets.len() {
          self.grow();
        }
        let index = self.slots_used as usize;
        self.slots_used += 1;
        index
      }
    };

    let bucket = self.bucket_of(hash);
    let value = CanonStr::new(candidate);
    self.entries[index] = Entry {
      hash,
      next: self.buckets[bucket] - 1,
      last_use: self.current_use,
      value: value.clone(),
    };
    self.buckets[bucket] = index as i32 + 1;
    self.added += 1;

    value
  }

  fn evict_one(&mut self) {
    loop {
      if self.churn.gen0_empty() {
        self.regenerate_churn();
      }

      match self.churn.take_victim(self.last_victim) {
        Some((stamp, victim)) => {
          self.last_victim = stamp;
          if self.remove_tracked(stamp, &victim) {
            self.evicted += 1;
            return;
          }
        }
        None => {
          // Churn bookkeeping came up dry; boundedness still has to hold.
          if self.evict_oldest() {
            self.evicted += 1;
          }
          return;
        }
      }
    }
  }

  /// Refill the churn lists from the live entries. A positive stamp taken
  /// by its generation's list is negated on the spot, marking the entry as
  /// tracked. A pair displaced from a full list has the mark lifted again
  /// after the sweep; the displaced pair carries a negated stamp whether it
  /// was taken earlier this sweep or left over from an earlier one.
  fn regenerate_churn(&mut self) {
    let mut displaced: Vec<(i64, CanonStr)> = vec![];

    for entry in self.entries.iter_mut().take(self.slots_used as usize) {
      if entry.is_free() {
        continue;
      }
      let stamp = entry.last_use;
      if stamp < 0 {
        continue;
      }

      match self.churn.offer(stamp, &entry.value) {
        OfferOutcome::Accepted => entry.last_use = -stamp,
        OfferOutcome::AcceptedDisplacing(old) => {
          entry.last_use = -stamp;
          displaced.push(old);
        }
        OfferOutcome::Rejected => {}
      }
    }

    for (stamp, value) in displaced {
      if let Some(index) = self.find(value.as_str()).ok().flatten() {
        if self.entries[index].last_use == -stamp {
          self.entries[index].last_use = stamp;
        }
      }
    }
  }

  fn remove_tracked(&mut self, stamp: i64, value: &CanonStr) -> bool {
    match self.find(value.as_str()).ok().flatten() {
      Some(index) if self.entries[index].last_use == -stamp => {
        self.detach_index(index);
        true
      }
      _ => false,
    }
  }

  fn evict_oldest(&mut self) -> bool {
    let mut oldest: Option<(usize, i64)> = None;

    for index in 0..self.slots_used as usize {
      if self.entries[index].is_free() {
        continue;
      }

      let magnitude = self.entries[index].last_use.abs();
      let replace = match oldest {
        None => true,
        Some((_, current)) => magnitude < current,
      };
      if replace {
        oldest = Some((index, magnitude));
      }
    }

    match oldest {
      Some((index, magnitude)) => {
        let stamp = self.entries[index].last_use;
        if stamp < 0 {
          self.churn.remove(-stamp);
        }
        self.last_victim = magnitude;
        self.detach_index(index);
        true
      }
      None => false,
    }
  }

  fn find(&self, candidate: &str) -> TableResult<Option<usize>> {
    if self.buckets.is_empty() {
      return Ok(None);
    }

    let hash = self.hash_bytes(candidate.as_bytes());
    let mut walked = 0usize;
    let mut cursor = self.bucket_head(hash);

    while cursor != CHAIN_END {
      let entry = &self.entries[cursor as usize];
      if entry.hash == hash && entry.value.as_str() == candidate {
        return Ok(Some(cursor as usize));
      }

      cursor = entry.next;
      walked += 1;
      if walked > self.buckets.len() {
        return Err(TableError::ConcurrentModification);
      }
    }

    Ok(None)
  }

  /// Unlink the entry at `index` from its bucket chain and thread the slot
  /// onto the free list.
  fn detach_index(&mut self, index: usize) {
    let bucket = self.bucket_of(self.entries[index].hash);
    let mut previous = CHAIN_END;
    let mut cursor = self.buckets[bucket] - 1;

    while cursor != CHAIN_END {
      if cursor as usize == index {
        let next = self.entries[index].next;
        if previous == CHAIN_END {
          self.buckets[bucket] = next + 1;
        } else {
          self.entries[previous as usize].next = next;
        }

        self.free_slot(index);
        return;
      }

      previous = cursor;
      cursor = self.entries[cursor as usize].next;
    }
  }

  fn free_slot(&mut self, index: usize) {
    let free_head = self.free_head;
    let entry = &mut self.entries[index];
    entry.hash = 0;
    entry.last_use = 0;
    entry.value = CanonStr::empty();
    entry.next = -3 - free_head;

    self.free_head = index as i32;
    self.free_count += 1;
  }

  fn take_free_slot(&mut self) -> Option<usize> {
    if self.free_head == CHAIN_END {
      return None;
    }

    let index = self.free_head as usize;
    self.free_head = -3 - self.entries[index].next;
    self.free_count -= 1;
    Some(index)
  }

  fn grow(&mut self) {
    self.rebuild(primes::next_prime(self.count() * 2 + 1));
  }

  /// Resize the backing arrays and relink bucket chains. Free-listed slots
  /// keep their encoding; only live entries are rethreaded.
  fn rebuild(&mut self, capacity: usize) {
    self.entries.resize(capacity, Entry::unused());
    self.buckets = vec![0; capacity];
    self.multiplier = primes::fast_mod_multiplier(capacity);
    self.relink();
  }

  fn relink(&mut self) {
    for bucket in self.buckets.iter_mut() {
      *bucket = 0;
    }

    for index in 0..self.slots_used as usize {
      if self.entries[index].is_free() {
        continue;
      }

      let bucket = self.bucket_of(self.entries[index].hash);
      self.entries[index].next = self.buckets[bucket] - 1;
      self.buckets[bucket] = index as i32 + 1;
    }
  }

  /// Compact entries passing `keep_entry` to the front of the entry array,
  /// resetting the free list and bucket chains. Returns how many were
  /// dropped.
  fn retain_entries<F: FnMut(&Entry) -> bool>(&mut self, mut keep_entry: F) -> i64 {
    let mut keep = 0usize;
    let mut dropped = 0i64;

    for index in 0..self.slots_used as usize {
      if self.entries[index].is_free() {
        continue;
      }
      if !keep_entry(&self.entries[index]) {
        dropped += 1;
        continue;
      }

      if keep != index {
        self.entries.swap(keep, index);
      }
      keep += 1;
    }

    for entry in self.entries[keep..self.slots_used as usize].iter_mut() {
      *entry = Entry::unused();
    }

    self.slots_used = keep as i32;
    self.free_head = CHAIN_END;
    self.free_count = 0;
    self.relink();

    dropped
  }

  fn adopt_randomized(&mut self) {
    self.randomized = true;
    let seed = hash::process_seed();

    for entry in self.entries.iter_mut().take(self.slots_used as usize) {
      if entry.is_free() {
        continue;
      }

      entry.hash = hash::randomized(entry.value.as_bytes(), seed);
    }

    self.relink();
  }

  fn hash_bytes(&self, bytes: &[u8]) -> u32 {
    if self.randomized {
      hash::randomized(bytes, hash::process_seed())
    } else {
      hash::deterministic(bytes)
    }
  }

  fn bucket_of(&self, hash: u32) -> usize {
    primes::fast_mod(hash, self.buckets.len(), self.multiplier)
  }

  fn bucket_head(&self, hash: u32) -> i32 {
    self.buckets[self.bucket_of(hash)] - 1
  }
}

impl Default for InternTable {
  fn default() -> InternTable {
    InternTable::new()
  }
}
