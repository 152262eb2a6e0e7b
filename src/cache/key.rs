//! Cache Key Module
//!
//! Compound keys made of one string per configured field.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;

// == Key ==
/// Ordered compound key, one string per key field.
///
/// Two keys are equal only if they have the same length and the same
/// values in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    fields: Vec<String>,
}

impl Key {
    // == Constructor ==
    /// Creates a key from its field values, in configured order.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Returns the field values.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    // == Hash ==
    /// Computes the shard hash of the key.
    ///
    /// Each field is fed with its position and length so that `["ab", "c"]`
    /// and `["a", "bc"]` land on different hashes, whatever bytes the
    /// fields contain.
    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (index, field) in self.fields.iter().enumerate() {
            hasher.write_usize(index);
            hasher.write_usize(field.len());
            hasher.write(field.as_bytes());
        }
        hasher.finish()
    }
}

impl From<Vec<String>> for Key {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.fields.join(", "))
    }
}
