//! The two hashing modes of the intern table.
//!
//! A table starts out with a deterministic double-djb2 hash so that repeated
//! runs probe identical chains. When an insertion walks a chain long enough
//! to look like collision abuse, the table rehashes everything under a keyed
//! Marvin-style hash seeded once per process and never switches back.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::OnceLock;

const DJB2_SEED: u32 = 5381;
const DJB2_MIX: u32 = 1_566_083_941;

/// Deterministic mode: double djb2 over little-endian 32-bit words. The two
/// lanes alternate words, the tail word is zero padded.
pub fn deterministic(bytes: &[u8]) -> u32 {
  let mut h1 = DJB2_SEED;
  let mut h2 = DJB2_SEED;
  let mut lane = 0;

  let mut words = bytes.chunks_exact(4);
  for word in &mut words {
    let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    if lane == 0 {
      h1 = (h1.rotate_left(5).wrapping_add(h1)) ^ word;
    } else {
      h2 = (h2.rotate_left(5).wrapping_add(h2)) ^ word;
    }
    lane ^= 1;
  }

  let tail = words.remainder();
  if !tail.is_empty() {
    let mut padded = [0u8; 4];
    padded[..tail.len()].copy_from_slice(tail);
    let word = u32::from_le_bytes(padded);
    if lane == 0 {
      h1 = (h1.rotate_left(5).wrapping_add(h1)) ^ word;
    } else {
      h2 = (h2.rotate_left(5).wrapping_add(h2)) ^ word;
    }
  }

  h1.wrapping_add(h2.wrapping_mul(DJB2_MIX))
}

/// Randomized mode: Marvin-style keyed hash. The tail word carries a 0x80
/// marker so inputs differing only in trailing zero bytes hash apart.
pub fn randomized(bytes: &[u8], seed: u64) -> u32 {
  let mut s0 = seed as u32;
  let mut s1 = (seed >> 32) as u32;

  let mut words = bytes.chunks_exact(4);
  for word in &mut words {
    s0 = s0.wrapping_add(u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
    mix(&mut s0, &mut s1);
  }

  let mut tail: u32 = 0x80;
  for &byte in words.remainder().iter().rev() {
    tail = (tail << 8) | u32::from(byte);
  }

  s0 = s0.wrapping_add(tail);
  mix(&mut s0, &mut s1);
  mix(&mut s0, &mut s1);

  s0 ^ s1
}

#[inline]
fn mix(s0: &mut u32, s1: &mut u32) {
  *s1 ^= *s0;
  *s0 = s0.rotate_left(20);
  *s0 = s0.wrapping_add(*s1);
  *s1 = s1.rotate_left(9);
  *s1 ^= *s0;
  *s0 = s0.rotate_left(27);
  *s0 = s0.wrapping_add(*s1);
  *s1 = s1.rotate_left(19);
}

/// Seed for the randomized mode, drawn once for the life of the process.
pub fn process_seed() -> u64 {
  static SEED: OnceLock<u64> = OnceLock::new();

  *SEED.get_or_init(|| {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(DJB2_MIX as u64);
    hasher.finish()
  })
}

/// A hash computed outside a table's critical section, together with the
/// hashing mode it was computed under so the table can detect a stale
/// snapshot and recompute.
#[derive(Clone, Copy, Debug)]
pub struct PrecomputedHash {
  value: u32,
  randomized: bool,
}

impl PrecomputedHash {
  /// Hash `bytes` under the indicated mode.
  pub fn compute(bytes: &[u8], randomized: bool) -> PrecomputedHash {
    let value = if randomized {
      self::randomized(bytes, process_seed())
    } else {
      deterministic(bytes)
    };

    PrecomputedHash { value, randomized }
  }

  /// The 32-bit hash value.
  pub fn value(&self) -> u32 {
    self.value
  }

  /// Which mode the value was computed under.
  pub fn is_randomized(&self) -> bool {
    self.randomized
  }
}

#[cfg(test)]
mod test {
  use super::*;

  mod deterministic {
    use super::*;

    #[test]
    fn stable_across_calls() {
      assert_eq!(deterministic(b"canon"), deterministic(b"canon"));
      assert_eq!(deterministic(b""), deterministic(b""));
    }

    #[test]
    fn word_tails_differ() {
      assert_ne!(deterministic(b"abcd"), deterministic(b"abc"));
      assert_ne!(deterministic(b"abcde"), deterministic(b"abcdf"));
    }
  }

  mod randomized {
    use super::*;

    #[test]
    fn seed_changes_value() {
      assert_ne!(randomized(b"canon", 1), randomized(b"canon", 2));
    }

    #[test]
    fn trailing_zero_bytes_differ() {
      assert_ne!(randomized(b"ab", 7), randomized(b"ab\0", 7));
    }

    #[test]
    fn stable_for_one_seed() {
      assert_eq!(randomized(b"canon", 42), randomized(b"canon", 42));
    }
  }

  mod precomputed {
    use super::*;

    #[test]
    fn matches_mode_functions() {
      let plain = PrecomputedHash::compute(b"canon", false);
      assert_eq!(plain.value(), deterministic(b"canon"));
      assert!(!plain.is_randomized());

      let keyed = PrecomputedHash::compute(b"canon", true);
      assert_eq!(keyed.value(), randomized(b"canon", process_seed()));
      assert!(keyed.is_randomized());
    }
  }
}
