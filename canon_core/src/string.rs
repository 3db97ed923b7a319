use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// A canonical shared string handle.
///
/// `CanonStr` is what the intern table stores and returns: an immutable
/// string behind a shared allocation, the size of a couple of pointers.
/// Equality, ordering and hashing follow the string value; whether two
/// handles share one stored allocation is asked separately through
/// [`CanonStr::same`].
///
/// # Examples
/// ```
/// use canon_core::CanonStr;
///
/// let first = CanonStr::new("chorus");
/// let second = first.clone();
///
/// assert_eq!(first, second);
/// assert!(first.same(&second));
/// assert!(!first.same(&CanonStr::new("chorus")));
/// ```
#[derive(Clone)]
pub struct CanonStr(Arc<str>);

impl CanonStr {
  /// Materialize a new shared handle for `src`. An empty `src` yields the
  /// process-wide canonical empty string rather than a fresh allocation.
  pub fn new(src: &str) -> CanonStr {
    if src.is_empty() {
      return CanonStr::empty();
    }

    CanonStr(Arc::from(src))
  }

  /// The process-wide canonical empty string.
  ///
  /// # Examples
  /// ```
  /// use canon_core::CanonStr;
  ///
  /// assert!(CanonStr::empty().same(&CanonStr::new("")));
  /// ```
  pub fn empty() -> CanonStr {
    static EMPTY: OnceLock<CanonStr> = OnceLock::new();
    EMPTY.get_or_init(|| CanonStr(Arc::from(""))).clone()
  }

  /// Do the two handles point at one stored allocation? This is the
  /// identity the pool guarantees for equal values between evictions.
  #[inline]
  pub fn same(&self, other: &CanonStr) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  #[inline]
  pub fn as_str(&self) -> &str {
    &self.0
  }

  #[inline]
  pub fn as_bytes(&self) -> &[u8] {
    self.0.as_bytes()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Deref for CanonStr {
  type Target = str;

  #[inline]
  fn deref(&self) -> &str {
    self.as_str()
  }
}

impl Default for CanonStr {
  #[inline]
  fn default() -> CanonStr {
    CanonStr::empty()
  }
}

impl From<&str> for CanonStr {
  fn from(src: &str) -> CanonStr {
    CanonStr::new(src)
  }
}

impl From<String> for CanonStr {
  fn from(src: String) -> CanonStr {
    CanonStr::new(&src)
  }
}

impl PartialEq for CanonStr {
  #[inline]
  fn eq(&self, other: &CanonStr) -> bool {
    self.same(other) || self.as_str() == other.as_str()
  }
}

impl Eq for CanonStr {}

impl PartialEq<str> for CanonStr {
  #[inline]
  fn eq(&self, other: &str) -> bool {
    self.as_str() == other
  }
}

impl PartialEq<&str> for CanonStr {
  #[inline]
  fn eq(&self, other: &&str) -> bool {
    self.as_str() == *other
  }
}

impl PartialOrd for CanonStr {
  #[inline]
  fn partial_cmp(&self, other: &CanonStr) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for CanonStr {
  #[inline]
  fn cmp(&self, other: &CanonStr) -> Ordering {
    self.as_str().cmp(other.as_str())
  }
}

impl Hash for CanonStr {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.as_str().hash(state)
  }
}

impl Borrow<str> for CanonStr {
  #[inline]
  fn borrow(&self) -> &str {
    self.as_str()
  }
}

impl AsRef<str> for CanonStr {
  #[inline]
  fn as_ref(&self) -> &str {
    self.as_str()
  }
}

impl AsRef<[u8]> for CanonStr {
  #[inline]
  fn as_ref(&self) -> &[u8] {
    self.as_bytes()
  }
}

impl fmt::Debug for CanonStr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "'{}'", self.as_str())
  }
}

impl fmt::Display for CanonStr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  mod new {
    use super::*;

    #[test]
    fn fresh_allocations_are_distinct() {
      let first = CanonStr::new("verse");
      let second = CanonStr::new("verse");

      assert_eq!(first, second);
      assert!(!first.same(&second));
    }

    #[test]
    fn empty_is_canonical() {
      assert!(CanonStr::new("").same(&CanonStr::empty()));
      assert!(CanonStr::default().same(&CanonStr::empty()));
    }
  }

  mod same {
    use super::*;

    #[test]
    fn clones_share_the_allocation() {
      let value = CanonStr::new("verse");
      assert!(value.same(&value.clone()));
    }
  }

  mod value {
    use super::*;

    #[test]
    fn derefs_to_str() {
      let value = CanonStr::new("verse");

      assert_eq!(&*value, "verse");
      assert_eq!(value.len(), 5);
      assert_eq!(value, "verse");
      assert!(!value.is_empty());
    }

    #[test]
    fn orders_by_value() {
      assert!(CanonStr::new("a") < CanonStr::new("b"));
    }
  }
}
