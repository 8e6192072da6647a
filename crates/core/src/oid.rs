//! Document identifiers
//!
//! This module defines ObjectId: a 24-hex-character random identifier
//! (96 bits of entropy) mimicking an opaque database-generated id. It is
//! assigned when a new document reaches the storage layer without an
//! identifier of its own.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random bytes in an identifier (renders as 24 hex characters)
const OID_BYTES: usize = 12;

/// Opaque document identifier
///
/// A wrapper around 24 lowercase hex characters. Generated randomly;
/// carries no embedded timestamp or machine id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a new random identifier
    pub fn new() -> Self {
        let mut bytes = [0u8; OID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut hex = String::with_capacity(OID_BYTES * 2);
        for byte in bytes {
            hex.push_str(&format!("{:02x}", byte));
        }
        ObjectId(hex)
    }

    /// Parse an identifier from a string representation
    ///
    /// Accepts exactly 24 hex characters. Returns None otherwise.
    pub fn from_string(s: &str) -> Option<Self> {
        if s.len() == OID_BYTES * 2 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(ObjectId(s.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_shape() {
        let id = ObjectId::new();
        assert_eq!(id.as_str().len(), 24);
        assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_uniqueness() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_string() {
        let id = ObjectId::new();
        let parsed = ObjectId::from_string(id.as_str()).unwrap();
        assert_eq!(parsed, id);

        assert!(ObjectId::from_string("short").is_none());
        assert!(ObjectId::from_string("zz3456789012345678901234").is_none());
    }
}
