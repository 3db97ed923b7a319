//! Background trimming driven by host collection notifications.
//!
//! The host invokes a [`CollectionHandle`] once per generational memory
//! sweep. Each invocation queues exactly one trim pass on the pool's
//! background worker; a pass already in flight makes further requests
//! no-ops. A pass reads the memory facility, and either detaches every
//! shard outright (high pressure) or trims them at a level that cycles
//! minor, medium, major across sweeps.

use std::sync::Arc;

use crate::pool::SharedPool;

const HIGH_PRESSURE_PERCENT: u64 = 90;
const MEDIUM_PRESSURE_PERCENT: u64 = 70;

/// Relative memory pressure at trim time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryPressure {
  Low,
  Medium,
  High,
}

impl MemoryPressure {
  /// Classify used bytes against the host's high-load threshold.
  pub fn classify(bytes_used: u64, high_load_threshold: u64) -> MemoryPressure {
    if high_load_threshold == 0 {
      return MemoryPressure::High;
    }

    let percent = (u128::from(bytes_used) * 100 / u128::from(high_load_threshold)) as u64;
    if percent >= HIGH_PRESSURE_PERCENT {
      MemoryPressure::High
    } else if percent >= MEDIUM_PRESSURE_PERCENT {
      MemoryPressure::Medium
    } else {
      MemoryPressure::Low
    }
  }
}

/// The handle a host memory collector invokes once per sweep.
#[derive(Clone)]
pub struct CollectionHandle {
  pool: Arc<SharedPool>,
}

impl CollectionHandle {
  pub fn new(pool: Arc<SharedPool>) -> CollectionHandle {
    CollectionHandle { pool }
  }

  /// Queue one trim pass on the pool's worker. Returns false once the
  /// worker has shut down.
  pub fn notify(&self) -> bool {
    let pool = Arc::clone(&self.pool);
    self.pool.worker().enqueue(Box::new(move || pool.run_trim()))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  mod classify {
    use super::*;

    #[test]
    fn boundaries() {
      assert_eq!(MemoryPressure::classify(0, 100), MemoryPressure::Low);
      assert_eq!(MemoryPressure::classify(69, 100), MemoryPressure::Low);
      assert_eq!(MemoryPressure::classify(70, 100), MemoryPressure::Medium);
      assert_eq!(MemoryPressure::classify(89, 100), MemoryPressure::Medium);
      assert_eq!(MemoryPressure::classify(90, 100), MemoryPressure::High);
      assert_eq!(MemoryPressure::classify(200, 100), MemoryPressure::High);
    }

    #[test]
    fn degenerate_threshold_reads_as_high() {
      assert_eq!(MemoryPressure::classify(1, 0), MemoryPressure::High);
    }

    #[test]
    fn huge_readings_do_not_overflow() {
      assert_eq!(
        MemoryPressure::classify(u64::MAX, u64::MAX),
        MemoryPressure::High
      );
    }
  }
}
