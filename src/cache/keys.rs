//! Response cache key definitions.
//!
//! A cached entry is addressed by the request path plus a hash of the raw
//! query string, so `/?page=1` and `/?page=2` cache independently.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub query_hash: u64,
}

impl ResponseKey {
    pub fn from_parts(path: &str, query: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            query_hash: hash_query(query.unwrap_or("")),
        }
    }
}

/// Hash a query string for cache key generation.
pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_query_produces_same_hash() {
        assert_eq!(hash_query("page=2"), hash_query("page=2"));
    }

    #[test]
    fn different_queries_produce_different_hashes() {
        assert_ne!(hash_query("page=1"), hash_query("page=2"));
    }

    #[test]
    fn key_distinguishes_pages() {
        let first = ResponseKey::from_parts("/", Some("page=1"));
        let second = ResponseKey::from_parts("/", Some("page=2"));
        assert_ne!(first, second);
    }

    #[test]
    fn absent_query_matches_empty_query() {
        let bare = ResponseKey::from_parts("/", None);
        let empty = ResponseKey::from_parts("/", Some(""));
        assert_eq!(bare, empty);
    }
}
