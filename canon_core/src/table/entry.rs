use crate::string::CanonStr;

/// Chain terminator for the `next` link. Anything below it marks a slot on
/// the free list, encoded as `-3 - previous_free_head`.
pub(crate) const CHAIN_END: i32 = -1;

/// One slot of the intern table.
///
/// `last_use` is the tagged use stamp: its magnitude is the table's use
/// counter at the entry's last touch, its low bit is the generation (0 only
/// ever inserted, 1 hit since insertion) and a negative sign marks the entry
/// as tracked in the churn pool.
#[derive(Clone)]
pub struct Entry {
  pub(crate) hash: u32,
  pub(crate) next: i32,
  pub(crate) last_use: i64,
  pub(crate) value: CanonStr,
}

impl Entry {
  /// A placeholder for slots past the in-use watermark.
  pub(crate) fn unused() -> Entry {
    Entry {
      hash: 0,
      next: CHAIN_END,
      last_use: 0,
      value: CanonStr::empty(),
    }
  }

  /// Is this slot on the free list?
  #[inline]
  pub(crate) fn is_free(&self) -> bool {
    self.next < CHAIN_END
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn free_encoding() {
    let mut entry = Entry::unused();
    assert!(!entry.is_free());

    // freeing onto an empty list
    entry.next = -3 - CHAIN_END;
    assert!(entry.is_free());
    assert_eq!(-3 - entry.next, CHAIN_END);

    // freeing onto a list headed at slot 4
    entry.next = -3 - 4;
    assert!(entry.is_free());
    assert_eq!(-3 - entry.next, 4);
  }
}
