#![deny(clippy::all)]
pub mod churn;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod primes;
pub mod string;
pub mod support;
pub mod table;

pub use error::{EncodingError, EncodingResult, TableError, TableResult};
pub use string::CanonStr;
pub use table::{InternTable, InternTableBuilder, TrimLevel};

pub type CanonHashSet<K> = HashSet<K, FnvBuildHasher>;
pub type CanonHashMap<K, V> = HashMap<K, V, FnvBuildHasher>;

use fnv::FnvBuildHasher;
use hashbrown::{HashMap, HashSet};
