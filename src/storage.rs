//! Binary array store collaborator
//!
//! The proprietary array store is not reimplemented here; it is modeled
//! as a trait: given a numeric array identifier, return a sequence of
//! IEEE-754 doubles or fail. A production implementation binds the
//! vendor library behind this trait; [`InMemoryStorage`] backs tests and
//! the sandbox binary.
//!
//! Storage handles are scoped to one source: opened when the source is
//! opened, released when the owning [`crate::BafSource`] is closed or
//! dropped, on every exit path.

use anyhow::{Result, anyhow};
use std::collections::HashMap;

/// Read access to the per-source binary array store.
pub trait ArrayStorage {
    /// Read the array stored under `array_id` as IEEE-754 doubles.
    ///
    /// Fails when the identifier does not resolve; the caller maps that
    /// into a [`crate::ConvertError::BinaryRead`] carrying scan context.
    fn read_f64_array(&self, array_id: i64) -> Result<Vec<f64>>;
}

/// HashMap-backed storage for tests and demonstrations.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    arrays: HashMap<i64, Vec<f64>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, array_id: i64, values: Vec<f64>) {
        self.arrays.insert(array_id, values);
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

impl ArrayStorage for InMemoryStorage {
    fn read_f64_array(&self, array_id: i64) -> Result<Vec<f64>> {
        self.arrays
            .get(&array_id)
            .cloned()
            .ok_or_else(|| anyhow!("array id {} does not resolve in storage", array_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_storage_read() {
        let mut storage = InMemoryStorage::new();
        storage.insert(10, vec![100.0, 200.0]);

        assert_eq!(storage.read_f64_array(10).unwrap(), vec![100.0, 200.0]);
        assert!(storage.read_f64_array(11).is_err());
    }
}
