mod support;

use std::sync::Arc;
use std::thread;

use canon_core::support::distinct_strings;
use canon_pool::{CanonStr, Encoding, SharedPool};
use fnv::FnvBuildHasher;
use hashbrown::HashSet;

#[test]
fn multi_flavor_identity() {
  let pool = SharedPool::new();

  let canonical = pool.intern("abc").unwrap();
  let from_utf8 = pool.intern_utf8(b"abc").unwrap();
  let from_ascii = pool.intern_ascii(b"abc").unwrap();
  let from_encoded = pool.intern_encoded(b"abc", Encoding::Ascii).unwrap();

  assert!(canonical.same(&from_utf8));
  assert!(canonical.same(&from_ascii));
  assert!(canonical.same(&from_encoded));

  let stats = pool.stats();
  assert_eq!(stats.count, 1);
  assert_eq!(stats.considered, 4);
  assert_eq!(stats.added, 1);
  assert_eq!(stats.deduped, 3);
}

#[test]
fn encodings_converge_on_one_instance() {
  let pool = SharedPool::new();

  let canonical = pool.intern("café").unwrap();
  let latin1 = pool
    .intern_encoded(&[0x63, 0x61, 0x66, 0xe9], Encoding::Latin1)
    .unwrap();
  let utf16 = pool
    .intern_encoded(
      &[0x63, 0x00, 0x61, 0x00, 0x66, 0x00, 0xe9, 0x00],
      Encoding::Utf16Le,
    )
    .unwrap();

  assert!(canonical.same(&latin1));
  assert!(canonical.same(&utf16));
  assert_eq!(pool.stats().count, 1);
}

#[test]
fn oversized_encoded_inputs_use_the_rented_path() {
  let pool = SharedPool::new();

  // 300 Latin-1 e-acutes decode to 600 UTF-8 bytes, inside the pool cap
  let bytes = vec![0xe9u8; 300];
  let decoded = "é".repeat(300);

  let stored = pool.intern_encoded(&bytes, Encoding::Latin1).unwrap();

  assert!(stored.same(&pool.intern(&decoded).unwrap()));
  assert_eq!(pool.stats().count, 1);
}

#[test]
fn invalid_bytes_are_rejected() {
  let pool = SharedPool::new();

  assert!(pool.intern_ascii("héllo".as_bytes()).is_err());
  assert!(pool.intern_utf8(&[0xff, 0xfe]).is_err());
  assert!(pool
    .intern_encoded(&[0x61], Encoding::Utf16Le)
    .is_err());
  assert_eq!(pool.stats().count, 0);
}

#[test]
fn null_empty_and_overlength_short_circuit() {
  let pool = SharedPool::new();

  assert!(pool.intern_opt(None).unwrap().is_none());

  let empty = pool.intern("").unwrap();
  assert!(empty.same(&CanonStr::empty()));

  let long = "x".repeat(641);
  let first = pool.intern(&long).unwrap();
  let second = pool.intern(&long).unwrap();
  assert_eq!(first, second);
  assert!(!first.same(&second));

  let stats = pool.stats();
  assert_eq!(stats.count, 0);
  assert_eq!(stats.added, 0);
  assert_eq!(stats.considered, 4);
  assert_eq!(stats.deduped, 4);
}

#[test]
fn boundary_length_is_stored() {
  let pool = SharedPool::new();
  let exact = "y".repeat(640);

  let first = pool.intern(&exact).unwrap();

  assert!(pool.intern(&exact).unwrap().same(&first));
  assert_eq!(pool.stats().count, 1);
}

#[test]
fn contains_remove_and_entries() {
  let pool = SharedPool::new();

  for value in distinct_strings(50) {
    pool.intern(&value).unwrap();
  }

  assert!(pool.contains("s17").unwrap());

  let snapshot: HashSet<String, FnvBuildHasher> =
    pool.entries().map(|value| value.to_string()).collect();
  assert_eq!(snapshot.len(), 50);
  for value in distinct_strings(50) {
    assert!(snapshot.contains(&value), "{value}");
  }

  assert!(pool.remove("s17").unwrap());
  assert!(!pool.contains("s17").unwrap());
  assert!(!pool.remove("s17").unwrap());
  assert_eq!(pool.entries().count(), 49);
  assert_eq!(pool.stats().count, 49);
}

#[test]
fn clear_keeps_cumulative_counters() {
  let pool = SharedPool::new();

  for value in distinct_strings(20) {
    pool.intern(&value).unwrap();
  }
  pool.clear();

  let stats = pool.stats();
  assert_eq!(stats.count, 0);
  assert_eq!(stats.added, 20);
  assert_eq!(stats.considered, 20);
}

#[test]
fn ensure_capacity_prepares_all_shards() {
  let pool = SharedPool::new();
  pool.ensure_capacity(3_200).unwrap();

  for value in distinct_strings(200) {
    pool.intern(&value).unwrap();
  }

  assert_eq!(pool.stats().count, 200);
}

#[test]
fn shared_pool_is_process_wide() {
  let first = SharedPool::shared();
  let second = SharedPool::shared();

  let stored = first.intern("canon-shared-probe").unwrap();
  assert!(second.intern("canon-shared-probe").unwrap().same(&stored));
}

#[test]
fn concurrent_interning_agrees_on_instances() {
  let pool = Arc::new(SharedPool::new());
  let values = Arc::new(distinct_strings(100));

  let workers: Vec<_> = (0..8)
    .map(|_| {
      let pool = Arc::clone(&pool);
      let values = Arc::clone(&values);

      thread::spawn(move || {
        let mut seen = Vec::with_capacity(values.len() * 25);
        for _ in 0..25 {
          for value in values.iter() {
            seen.push(pool.intern(value).unwrap());
          }
        }
        seen
      })
    })
    .collect();

  let per_thread: Vec<Vec<CanonStr>> = workers
    .into_iter()
    .map(|worker| worker.join().unwrap())
    .collect();

  assert_eq!(pool.stats().count, 100);

  for seen in &per_thread {
    for (slot, handle) in seen.iter().enumerate() {
      let value = &values[slot % values.len()];
      assert!(pool.intern(value).unwrap().same(handle), "{value}");
    }
  }
}

#[test]
fn counter_algebra_holds_on_the_pool() {
  let pool = SharedPool::new();

  for value in distinct_strings(60) {
    pool.intern(&value).unwrap();
  }
  for value in distinct_strings(30) {
    pool.intern(&value).unwrap();
  }
  pool.intern_opt(None).unwrap();
  pool.intern("").unwrap();

  let stats = pool.stats();
  assert!(stats.considered >= stats.added);
  assert_eq!(stats.deduped, stats.considered - stats.added);
  assert!((stats.count as i64) <= stats.added);
  assert_eq!(stats.considered, 92);
}
