//! Cache key families.

use serde::{Deserialize, Serialize};

const ALL_RECORDS: &str = "all-records";
const RECORD_PREFIX: &str = "record:";

/// Key of one cache slot.
///
/// Two families exist: the single collection slot (`"all-records"`) and one
/// slot per individually fetched record (`"record:<id>"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    /// The collection slot.
    pub fn all_records() -> Self {
        Self {
            hash: ALL_RECORDS.to_string(),
        }
    }

    /// The slot for one record.
    pub fn record(id: &str) -> Self {
        Self {
            hash: format!("{}{}", RECORD_PREFIX, id),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_families() {
        assert_eq!(CacheKey::all_records().to_string(), "all-records");
        assert_eq!(CacheKey::record("abc").to_string(), "record:abc");
        assert_ne!(CacheKey::record("all-records"), CacheKey::all_records());
    }
}
