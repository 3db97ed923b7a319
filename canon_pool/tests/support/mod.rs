use std::sync::Arc;

use canon_env::memory::{Memory, MemoryMock};
use canon_pool::{SharedPool, SharedPoolBuilder};

/// A private pool whose memory readings the test controls.
#[allow(dead_code)]
pub fn pool_with_memory() -> (SharedPool, Arc<MemoryMock>) {
  let mock = Arc::new(MemoryMock::default());
  let pool = SharedPoolBuilder::new()
    .memory(Memory::new(Box::new(Arc::clone(&mock))))
    .build();

  (pool, mock)
}
