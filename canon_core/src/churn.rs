//! Two-generation approximation of LRU victims.
//!
//! Rather than maintaining a recency list across every lookup, the table
//! keeps two small sorted lists of eviction candidates, one per generation,
//! refilled by a full sweep only when the first-use list runs dry. Victims
//! come off the front; entries that get hit while tracked are pulled back
//! out by their stamp.

use crate::string::CanonStr;

/// Upper bound on tracked victims per generation.
pub const CHURN_LIMIT: usize = 32;

/// Result of offering a candidate to a churn list.
pub enum OfferOutcome {
  /// The candidate was taken.
  Accepted,
  /// The candidate was taken, displacing the newest tracked pair.
  AcceptedDisplacing((i64, CanonStr)),
  /// The candidate is newer than everything in a full list.
  Rejected,
}

/// A bounded list of `(stamp, value)` pairs sorted ascending by stamp.
#[derive(Default)]
struct ChurnList {
  slots: Vec<(i64, CanonStr)>,
}

impl ChurnList {
  fn offer(&mut self, stamp: i64, value: &CanonStr) -> OfferOutcome {
    let position = match self.slots.binary_search_by_key(&stamp, |&(slot, _)| slot) {
      Ok(_) => return OfferOutcome::Rejected,
      Err(position) => position,
    };

    if self.slots.len() < CHURN_LIMIT {
      self.slots.insert(position, (stamp, value.clone()));
      return OfferOutcome::Accepted;
    }

    if position < CHURN_LIMIT {
      let displaced = self.slots.pop().expect("churn list at capacity");
      self.slots.insert(position, (stamp, value.clone()));
      return OfferOutcome::AcceptedDisplacing(displaced);
    }

    OfferOutcome::Rejected
  }

  fn remove(&mut self, stamp: i64) -> bool {
    match self.slots.binary_search_by_key(&stamp, |&(slot, _)| slot) {
      Ok(position) => {
        self.slots.remove(position);
        true
      }
      Err(_) => false,
    }
  }

  fn tracks(&self, stamp: i64) -> bool {
    self
      .slots
      .binary_search_by_key(&stamp, |&(slot, _)| slot)
      .is_ok()
  }

  fn front(&self) -> Option<i64> {
    self.slots.first().map(|&(stamp, _)| stamp)
  }

  fn pop_front(&mut self) -> Option<(i64, CanonStr)> {
    if self.slots.is_empty() {
      return None;
    }

    Some(self.slots.remove(0))
  }
}

/// The two generation lists backing a table's eviction choices.
#[derive(Default)]
pub struct ChurnPool {
  gen0: ChurnList,
  gen1: ChurnList,
}

impl ChurnPool {
  pub fn new() -> ChurnPool {
    ChurnPool::default()
  }

  /// Is the first-use list out of candidates? When it is, the table sweeps
  /// its entries to refill both lists.
  pub fn gen0_empty(&self) -> bool {
    self.gen0.slots.is_empty()
  }

  pub fn is_empty(&self) -> bool {
    self.gen0.slots.is_empty() && self.gen1.slots.is_empty()
  }

  /// Offer a positive-stamp candidate to the list for its generation.
  pub fn offer(&mut self, stamp: i64, value: &CanonStr) -> OfferOutcome {
    self.list_for(stamp).offer(stamp, value)
  }

  /// Is `stamp` tracked in the list for its generation?
  pub fn tracks(&self, stamp: i64) -> bool {
    let list = if stamp & 1 == 0 { &self.gen0 } else { &self.gen1 };
    list.tracks(stamp)
  }

  /// Drop the pair stamped `stamp` from its generation's list. Tolerates a
  /// miss: a tracked pair can be displaced by a fuller regeneration before
  /// its entry is ever hit.
  pub fn remove(&mut self, stamp: i64) -> bool {
    self.list_for(stamp).remove(stamp)
  }

  /// Pop the next victim. The first-use front goes first; the multi-use
  /// front is preferred only when both fronts predate the previous victim,
  /// or when the first-use list is empty.
  pub fn take_victim(&mut self, last_victim: i64) -> Option<(i64, CanonStr)> {
    let front0 = match self.gen0.front() {
      Some(front) => front,
      None => return self.gen1.pop_front(),
    };

    if let Some(front1) = self.gen1.front() {
      if front0 < last_victim && front1 < last_victim {
        return self.gen1.pop_front();
      }
    }

    self.gen0.pop_front()
  }

  pub fn clear(&mut self) {
    self.gen0.slots.clear();
    self.gen1.slots.clear();
  }

  fn list_for(&mut self, stamp: i64) -> &mut ChurnList {
    if stamp & 1 == 0 {
      &mut self.gen0
    } else {
      &mut self.gen1
    }
  }
}
