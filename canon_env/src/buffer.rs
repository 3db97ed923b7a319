use std::sync::Mutex;

/// Most buffers retained for reuse.
const POOL_LIMIT: usize = 8;

/// A bounded pool of reusable decode buffers.
///
/// Transcoding an oversized candidate needs somewhere to put the code units;
/// renting here keeps the hot path from allocating a fresh buffer per call.
/// Buffers are handed back cleared and the pool never holds more than a
/// handful.
#[derive(Default)]
pub struct BufferPool {
  buffers: Mutex<Vec<String>>,
}

impl BufferPool {
  pub fn new() -> BufferPool {
    BufferPool::default()
  }

  /// Take a cleared buffer with at least `capacity` bytes reserved.
  pub fn rent(&self, capacity: usize) -> String {
    let mut buffer = match self.buffers.lock() {
      Ok(mut buffers) => buffers.pop().unwrap_or_default(),
      Err(_) => String::new(),
    };

    buffer.clear();
    buffer.reserve(capacity);
    buffer
  }

  /// Hand a buffer back for reuse.
  pub fn release(&self, buffer: String) {
    if let Ok(mut buffers) = self.buffers.lock() {
      if buffers.len() < POOL_LIMIT {
        buffers.push(buffer);
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn rented_buffers_come_back_cleared() {
    let pool = BufferPool::new();

    let mut buffer = pool.rent(16);
    buffer.push_str("scratch");
    pool.release(buffer);

    let buffer = pool.rent(4);
    assert!(buffer.is_empty());
    assert!(buffer.capacity() >= 4);
  }

  #[test]
  fn pool_is_bounded() {
    let pool = BufferPool::new();

    for _ in 0..32 {
      pool.release(String::with_capacity(8));
    }

    let retained = pool.buffers.lock().unwrap().len();
    assert!(retained <= POOL_LIMIT);
  }
}
