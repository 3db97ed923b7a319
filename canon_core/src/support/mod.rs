//! Fixtures shared by the unit and integration suites.

use crate::hash;
use crate::primes;
use crate::table::InternTable;
use crate::CanonHashSet;

/// `count` distinct short strings `s1..sN`.
pub fn distinct_strings(count: usize) -> Vec<String> {
  (1..=count).map(|index| format!("s{index}")).collect()
}

/// `count` strings that land in one bucket of a `capacity`-sized table under
/// the deterministic hashing mode. Searches candidate keys by brute force;
/// meant for collision-abuse tests, not hot paths.
pub fn bucket_colliding_strings(count: usize, capacity: usize) -> Vec<String> {
  let multiplier = primes::fast_mod_multiplier(capacity);
  let target = primes::fast_mod(hash::deterministic(b"k0"), capacity, multiplier);

  let mut found = Vec::with_capacity(count);
  let mut index = 0usize;
  while found.len() < count {
    let candidate = format!("k{index}");
    if primes::fast_mod(hash::deterministic(candidate.as_bytes()), capacity, multiplier) == target
    {
      found.push(candidate);
    }
    index += 1;
  }

  found
}

/// Membership snapshot of a table for set-style assertions.
pub fn member_set(table: &InternTable) -> CanonHashSet<String> {
  table.entries().map(|value| value.as_str().to_string()).collect()
}
