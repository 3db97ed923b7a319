use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A wrapper around the memory facilities provided by the host.
///
/// The pool only needs two readings to steer its trim passes: how many bytes
/// the host currently considers in use, and the level it considers high load.
pub struct Memory {
  memory: Box<dyn MemoryImpl>,
}

impl Default for Memory {
  fn default() -> Self {
    Self {
      memory: Box::new(MemoryMock::default()),
    }
  }
}

impl Memory {
  /// Create a new wrapper around the provided memory reporting.
  pub fn new(memory: Box<dyn MemoryImpl>) -> Self {
    Self { memory }
  }

  /// Bytes the host currently considers in use.
  pub fn bytes_used(&self) -> u64 {
    self.memory.bytes_used()
  }

  /// The usage level the host considers high load.
  pub fn high_load_threshold(&self) -> u64 {
    self.memory.high_load_threshold()
  }
}

pub trait MemoryImpl: Send + Sync {
  fn bytes_used(&self) -> u64;
  fn high_load_threshold(&self) -> u64;
}

/// Bytes currently live through [`CountingAllocator`].
static COUNTED_BYTES: AtomicU64 = AtomicU64::new(0);

/// A drop-in wrapper around the system allocator that keeps a running byte
/// count for [`MemoryNative`]. Portable: no platform memory probes, just the
/// allocations this process makes.
///
/// # Examples
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: canon_env::memory::CountingAllocator =
///   canon_env::memory::CountingAllocator;
/// ```
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let ptr = System.alloc(layout);
    if !ptr.is_null() {
      COUNTED_BYTES.fetch_add(layout.size() as u64, Ordering::Relaxed);
    }
    ptr
  }

  unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
    System.dealloc(ptr, layout);
    COUNTED_BYTES.fetch_sub(layout.size() as u64, Ordering::Relaxed);
  }
}

/// Memory readings backed by the process-wide allocation counter.
///
/// Install [`CountingAllocator`] as the global allocator to make the
/// readings live; without it the counter stays at zero and pressure always
/// reads as low.
pub struct MemoryNative {
  high_load_threshold: u64,
}

impl MemoryNative {
  /// Readings against the byte level the host considers high load.
  pub fn new(high_load_threshold: u64) -> MemoryNative {
    MemoryNative {
      high_load_threshold,
    }
  }
}

impl Default for MemoryNative {
  fn default() -> Self {
    MemoryNative::new(u64::MAX)
  }
}

impl MemoryImpl for MemoryNative {
  fn bytes_used(&self) -> u64 {
    COUNTED_BYTES.load(Ordering::Relaxed)
  }

  fn high_load_threshold(&self) -> u64 {
    self.high_load_threshold
  }
}

/// Settable readings for driving pressure levels in tests.
pub struct MemoryMock {
  bytes_used: AtomicU64,
  high_load_threshold: AtomicU64,
}

impl MemoryMock {
  pub fn new(bytes_used: u64, high_load_threshold: u64) -> MemoryMock {
    MemoryMock {
      bytes_used: AtomicU64::new(bytes_used),
      high_load_threshold: AtomicU64::new(high_load_threshold),
    }
  }

  pub fn set_bytes_used(&self, bytes_used: u64) {
    self.bytes_used.store(bytes_used, Ordering::Relaxed);
  }

  pub fn set_high_load_threshold(&self, high_load_threshold: u64) {
    self
      .high_load_threshold
      .store(high_load_threshold, Ordering::Relaxed);
  }
}

impl Default for MemoryMock {
  fn default() -> Self {
    MemoryMock::new(0, u64::MAX)
  }
}

impl MemoryImpl for MemoryMock {
  fn bytes_used(&self) -> u64 {
    self.bytes_used.load(Ordering::Relaxed)
  }

  fn high_load_threshold(&self) -> u64 {
    self.high_load_threshold.load(Ordering::Relaxed)
  }
}

impl MemoryImpl for Arc<MemoryMock> {
  fn bytes_used(&self) -> u64 {
    self.as_ref().bytes_used()
  }

  fn high_load_threshold(&self) -> u64 {
    self.as_ref().high_load_threshold()
  }
}
