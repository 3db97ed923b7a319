//! The sharded thread-safe pool.
//!
//! Thirty-two intern tables, each behind its own mutex, keyed by the low
//! five bits of a candidate's first byte. Hashing and transcoding happen
//! outside the shard lock; the lock protects exactly one table operation.

use std::str;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use canon_core::encoding::{self, Encoding};
use canon_core::hash::PrecomputedHash;
use canon_core::table::{InternTable, InternTableBuilder, TrimLevel};
use canon_core::CanonStr;
use canon_env::buffer::BufferPool;
use canon_env::memory::Memory;
use canon_env::stdio::Stdio;
use canon_env::worker::Worker;

use crate::error::PoolResult;
use crate::stats::PoolStats;
use crate::trim::MemoryPressure;

/// Number of independent shards. A power of two so routing is a mask.
pub const SHARD_COUNT: usize = 32;

/// Longest candidate, in bytes, the shared pool will store. Longer inputs
/// are materialized and returned without entering any shard.
pub const MAX_SHARED_LENGTH: usize = 640;

/// Live entries one shard holds before its own LRU eviction kicks in.
const SHARD_MAX_COUNT: usize = 10_000;

struct Shard {
  table: Mutex<Option<InternTable>>,
  /// Snapshot of the table's hashing mode, readable without the lock so
  /// callers can hash before entering the critical section.
  randomized: AtomicBool,
}

impl Shard {
  fn new() -> Shard {
    Shard {
      table: Mutex::new(None),
      randomized: AtomicBool::new(false),
    }
  }
}

/// Configuration for a [`SharedPool`].
pub struct SharedPoolBuilder {
  memory: Memory,
  stdio: Stdio,
}

impl SharedPoolBuilder {
  pub fn new() -> SharedPoolBuilder {
    SharedPoolBuilder {
      memory: Memory::default(),
      stdio: Stdio::default(),
    }
  }

  /// Replace the memory reporting used to steer trim passes.
  pub fn memory(mut self, memory: Memory) -> SharedPoolBuilder {
    self.memory = memory;
    self
  }

  /// Replace the stdio the pool logs through.
  pub fn stdio(mut self, stdio: Stdio) -> SharedPoolBuilder {
    self.stdio = stdio;
    self
  }

  pub fn build(self) -> SharedPool {
    SharedPool {
      shards: std::array::from_fn(|_| Shard::new()),
      buffers: BufferPool::new(),
      memory: self.memory,
      worker: Worker::new(),
      trimming: AtomicBool::new(false),
      collections: AtomicU64::new(0),
      retained_considered: AtomicI64::new(0),
      retained_added: AtomicI64::new(0),
      retained_evicted: AtomicI64::new(0),
      short_considered: AtomicI64::new(0),
      stdio: Mutex::new(self.stdio),
    }
  }
}

impl Default for SharedPoolBuilder {
  fn default() -> SharedPoolBuilder {
    SharedPoolBuilder::new()
  }
}

/// A thread-safe string interning pool.
///
/// # Examples
/// ```
/// use canon_pool::SharedPool;
///
/// let pool = SharedPool::new();
/// let first = pool.intern("voice").unwrap();
/// let second = pool.intern("voice").unwrap();
///
/// assert!(first.same(&second));
/// assert_eq!(pool.stats().count, 1);
/// ```
pub struct SharedPool {
  shards: [Shard; SHARD_COUNT],
  buffers: BufferPool,
  memory: Memory,
  worker: Worker,
  trimming: AtomicBool,
  collections: AtomicU64,
  retained_considered: AtomicI64,
  retained_added: AtomicI64,
  retained_evicted: AtomicI64,
  /// Presentations resolved before shard routing: absent, empty and
  /// over-length candidates.
  short_considered: AtomicI64,
  #[allow(dead_code)]
  stdio: Mutex<Stdio>,
}

impl SharedPool {
  pub fn new() -> SharedPool {
    SharedPoolBuilder::new().build()
  }

  /// The process-wide shared pool, constructed on first use.
  pub fn shared() -> Arc<SharedPool> {
    static SHARED: OnceLock<Arc<SharedPool>> = OnceLock::new();
    SHARED.get_or_init(|| Arc::new(SharedPool::new())).clone()
  }

  /// Return the canonical instance for `candidate`, storing it first if
  /// absent from its shard.
  pub fn intern(&self, candidate: &str) -> PoolResult<CanonStr> {
    self.intern_units(candidate)
  }

  /// Nullable interning: absent in, absent out. The presentation still
  /// counts toward `considered` and `deduped`.
  pub fn intern_opt(&self, candidate: Option<&str>) -> PoolResult<Option<CanonStr>> {
    match candidate {
      Some(candidate) => self.intern(candidate).map(Some),
      None => {
        self.short_considered.fetch_add(1, Ordering::Relaxed);
        Ok(None)
      }
    }
  }

  /// Intern bytes interpreted as 7-bit code units.
  pub fn intern_ascii(&self, bytes: &[u8]) -> PoolResult<CanonStr> {
    let candidate = encoding::validate_ascii(bytes)?;
    self.intern_units(candidate)
  }

  /// Intern bytes decoded as UTF-8.
  pub fn intern_utf8(&self, bytes: &[u8]) -> PoolResult<CanonStr> {
    let candidate = encoding::validate_utf8(bytes)?;
    self.intern_units(candidate)
  }

  /// Intern bytes in any known encoding. Transcoding happens outside the
  /// shard lock: short inputs decode onto the stack, longer ones into a
  /// buffer rented from the scratch pool and released even on failure.
  pub fn intern_encoded(&self, bytes: &[u8], encoding: Encoding) -> PoolResult<CanonStr> {
    match encoding {
      Encoding::Ascii => self.intern_ascii(bytes),
      Encoding::Utf8 => self.intern_utf8(bytes),
      Encoding::Latin1 | Encoding::Utf16Le | Encoding::Utf16Be => {
        if bytes.len() <= encoding::STACK_DECODE_LIMIT {
          let mut stack = [0u8; encoding::STACK_BUFFER_BYTES];
          let written = encoding::decode_to_slice(bytes, encoding, &mut stack)?;

          // decode_to_slice only ever writes valid UTF-8 into the prefix
          let candidate = unsafe { str::from_utf8_unchecked(&stack[..written]) };
          self.intern_units(candidate)
        } else {
          let mut buffer = self.buffers.rent(bytes.len());
          let decoded = encoding::decode_to_string(bytes, encoding, &mut buffer);
          let result = match decoded {
            Ok(()) => self.intern_units(&buffer),
            Err(error) => Err(error.into()),
          };

          self.buffers.release(buffer);
          result
        }
      }
    }
  }

  /// Is `candidate` stored in its shard?
  pub fn contains(&self, candidate: &str) -> PoolResult<bool> {
    if candidate.is_empty() || candidate.len() > MAX_SHARED_LENGTH {
      return Ok(false);
    }

    let guard = self.lock_shard(shard_index(candidate.as_bytes()[0]));
    match guard.as_ref() {
      Some(table) => Ok(table.contains(candidate)?),
      None => Ok(false),
    }
  }

  /// Drop `candidate` from its shard if stored.
  pub fn remove(&self, candidate: &str) -> PoolResult<bool> {
    if candidate.is_empty() || candidate.len() > MAX_SHARED_LENGTH {
      return Ok(false);
    }

    let mut guard = self.lock_shard(shard_index(candidate.as_bytes()[0]));
    match guard.as_mut() {
      Some(table) => Ok(table.remove(candidate)?),
      None => Ok(false),
    }
  }

  /// Stored values across all shards, in unspecified order. Each shard is
  /// snapshotted under its lock as the iteration reaches it.
  pub fn entries(&self) -> Entries<'_> {
    Entries {
      pool: self,
      shard: 0,
      pending: vec![],
    }
  }

  /// Grow every shard to hold at least its share of `capacity` entries.
  pub fn ensure_capacity(&self, capacity: usize) -> PoolResult<()> {
    let per_shard = capacity.div_ceil(SHARD_COUNT);

    for index in 0..SHARD_COUNT {
      let mut guard = self.lock_shard(index);
      shard_table(&mut guard).ensure_capacity(per_shard)?;
    }

    Ok(())
  }

  /// Shrink every shard's backing arrays to fit its live entries.
  pub fn trim_excess(&self) {
    for index in 0..SHARD_COUNT {
      let mut guard = self.lock_shard(index);
      if let Some(table) = guard.as_mut() {
        table.trim_excess();
      }
    }
  }

  /// Drop every entry in every shard. Cumulative counters survive.
  pub fn clear(&self) {
    for index in 0..SHARD_COUNT {
      let mut guard = self.lock_shard(index);
      if let Some(table) = guard.as_mut() {
        table.clear();
      }
    }
  }

  /// Aggregate counters: live shards plus totals retained from shards
  /// released under memory pressure.
  pub fn stats(&self) -> PoolStats {
    let mut count = 0usize;
    let mut considered = self.retained_considered.load(Ordering::Relaxed)
      + self.short_considered.load(Ordering::Relaxed);
    let mut added = self.retained_added.load(Ordering::Relaxed);
    let mut evicted = self.retained_evicted.load(Ordering::Relaxed);

    for index in 0..SHARD_COUNT {
      let guard = self.lock_shard(index);
      if let Some(table) = guard.as_ref() {
        count += table.count();
        considered += table.considered();
        added += table.added();
        evicted += table.evicted();
      }
    }

    PoolStats {
      count,
      considered,
      added,
      deduped: considered - added,
      evicted,
    }
  }

  /// Collection sweeps observed so far.
  pub fn collections(&self) -> u64 {
    self.collections.load(Ordering::Relaxed)
  }

  /// Run one trim pass synchronously on the calling thread. The background
  /// path goes through [`crate::trim::CollectionHandle`].
  pub fn trim_now(&self) {
    self.run_trim();
  }

  fn intern_units(&self, candidate: &str) -> PoolResult<CanonStr> {
    if candidate.is_empty() {
      self.short_considered.fetch_add(1, Ordering::Relaxed);
      return Ok(CanonStr::empty());
    }
    if candidate.len() > MAX_SHARED_LENGTH {
      self.short_considered.fetch_add(1, Ordering::Relaxed);
      return Ok(CanonStr::new(candidate));
    }

    let index = shard_index(candidate.as_bytes()[0]);
    let shard = &self.shards[index];

    // hash outside the lock under the mode snapshot; the table recomputes
    // if the snapshot went stale
    let hash = PrecomputedHash::compute(
      candidate.as_bytes(),
      shard.randomized.load(Ordering::Relaxed),
    );

    let mut guard = self.lock_shard(index);
    let table = shard_table(&mut guard);
    let value = table.intern_hashed(candidate, hash)?;
    shard.randomized.store(table.is_randomized(), Ordering::Relaxed);

    Ok(value)
  }

  pub(crate) fn run_trim(&self) {
    if self
      .trimming
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return;
    }

    let pressure = MemoryPressure::classify(
      self.memory.bytes_used(),
      self.memory.high_load_threshold(),
    );
    let collections = self.collections.load(Ordering::Relaxed);

    #[cfg(feature = "log_trim")]
    self.log_trim(collections, pressure, "begin");

    if pressure == MemoryPressure::High {
      self.detach_shards();
    } else {
      self.trim_shards(TrimLevel::cycle(collections));
    }

    #[cfg(feature = "log_trim")]
    self.log_trim(collections, pressure, "end");

    self.collections.fetch_add(1, Ordering::Relaxed);
    self.trimming.store(false, Ordering::Release);
  }

  pub(crate) fn worker(&self) -> &Worker {
    &self.worker
  }

  /// Release every shard's table outright, folding its counters into the
  /// pool totals. Canonical identity for previously seen values is lost.
  fn detach_shards(&self) {
    for index in 0..SHARD_COUNT {
      let mut guard = self.lock_shard(index);
      if let Some(table) = guard.take() {
        #[cfg(feature = "log_trim")]
        self.log_shard_drop(index, table.count() as i64);

        self
          .retained_considered
          .fetch_add(table.considered(), Ordering::Relaxed);
        self.retained_added.fetch_add(table.added(), Ordering::Relaxed);
        self
          .retained_evicted
          .fetch_add(table.evicted(), Ordering::Relaxed);
        self.shards[index].randomized.store(false, Ordering::Relaxed);
      }
    }
  }

  fn trim_shards(&self, level: TrimLevel) {
    for index in 0..SHARD_COUNT {
      let mut guard = self.lock_shard(index);
      if let Some(table) = guard.as_mut() {
        #[cfg(feature = "log_trim")]
        let evicted_before = table.evicted();

        table.trim(level);

        #[cfg(feature = "log_trim")]
        self.log_shard_drop(index, table.evicted() - evicted_before);
      }
    }
  }

  /// Per-shard eviction detail for a sweep, in the same stream as the
  /// begin/end lines.
  #[cfg(feature = "log_trim")]
  fn log_shard_drop(&self, shard: usize, dropped: i64) {
    use std::io::Write;

    if dropped == 0 {
      return;
    }

    if let Ok(mut stdio) = self.stdio.lock() {
      writeln!(stdio.stdout(), "   shard {shard} dropped {dropped}")
        .expect("could not write to stdout");
    }
  }

  #[cfg(feature = "log_trim")]
  fn log_trim(&self, collections: u64, pressure: MemoryPressure, phase: &str) {
    use std::io::Write;

    if let Ok(mut stdio) = self.stdio.lock() {
      writeln!(
        stdio.stdout(),
        "-- trim {phase} {collections} ({pressure:?}) --"
      )
      .expect("could not write to stdout");
    }
  }

  fn lock_shard(&self, index: usize) -> MutexGuard<'_, Option<InternTable>> {
    match self.shards[index].table.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }
}

impl Default for SharedPool {
  fn default() -> SharedPool {
    SharedPool::new()
  }
}

/// Lazy per-shard snapshot iterator returned by [`SharedPool::entries`].
pub struct Entries<'a> {
  pool: &'a SharedPool,
  shard: usize,
  pending: Vec<CanonStr>,
}

impl Iterator for Entries<'_> {
  type Item = CanonStr;

  fn next(&mut self) -> Option<CanonStr> {
    loop {
      if let Some(value) = self.pending.pop() {
        return Some(value);
      }
      if self.shard == SHARD_COUNT {
        return None;
      }

      let guard = self.pool.lock_shard(self.shard);
      if let Some(table) = guard.as_ref() {
        self.pending.extend(table.entries());
      }
      self.shard += 1;
    }
  }
}

fn shard_index(first: u8) -> usize {
  (first & (SHARD_COUNT as u8 - 1)) as usize
}

fn shard_table(guard: &mut Option<InternTable>) -> &mut InternTable {
  guard.get_or_insert_with(|| {
    InternTableBuilder::new()
      .capacity(1)
      .max_count(SHARD_MAX_COUNT)
      .max_length(MAX_SHARED_LENGTH)
      .build()
      .expect("shard configuration is valid")
  })
}

#[cfg(test)]
mod test {
  use super::*;

  mod shard_index {
    use super::*;

    #[test]
    fn masks_the_low_five_bits() {
      assert_eq!(shard_index(b'a'), (b'a' & 31) as usize);
      assert_eq!(shard_index(0), 0);
      assert_eq!(shard_index(31), 31);
      assert_eq!(shard_index(32), 0);
      assert_eq!(shard_index(255), 31);
    }
  }

  mod intern {
    use super::*;

    #[test]
    fn values_with_one_first_byte_share_a_shard() {
      let pool = SharedPool::new();

      pool.intern("alpha").unwrap();
      pool.intern("apex").unwrap();

      let live: usize = (0..SHARD_COUNT)
        .filter(|&index| {
          let guard = pool.lock_shard(index);
          guard.as_ref().map_or(0, |table| table.count()) > 0
        })
        .count();

      assert_eq!(live, 1);
    }

    #[test]
    fn fast_path_snapshot_matches_table_mode() {
      let pool = SharedPool::new();

      pool.intern("alpha").unwrap();

      let index = shard_index(b'a');
      assert!(!pool.shards[index].randomized.load(Ordering::Relaxed));
    }
  }
}
