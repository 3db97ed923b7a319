use std::fmt;

/// Point-in-time aggregate counters for a shared pool: the live shards
/// summed together with totals retained from shards released under memory
/// pressure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
  /// Live entries across all shards.
  pub count: usize,
  /// Candidates ever presented.
  pub considered: i64,
  /// Entries ever added.
  pub added: i64,
  /// Presentations satisfied without adding an entry.
  pub deduped: i64,
  /// Entries removed by eviction, trim or detach.
  pub evicted: i64,
}

impl fmt::Display for PoolStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "count {} considered {} added {} deduped {} evicted {}",
      self.count, self.considered, self.added, self.deduped, self.evicted
    )
  }
}
