use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identifies one cached rendering of a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query_hash: u64,
    /// Hash of the session cookie value; anonymous viewers share `hash_value(&None::<&str>)`.
    pub session_hash: u64,
}

impl PageKey {
    pub fn new(path: &str, query: Option<&str>, session: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            query_hash: hash_query(query.unwrap_or("")),
            session_hash: hash_value(&session),
        }
    }
}

/// Compute a hash for any hashable value.
fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn hash_query(query: &str) -> u64 {
    hash_value(&query)
}
