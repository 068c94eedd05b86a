//! Benchmark result types.

use std::collections::HashMap;

use crate::error::{BenchError, Result};
use crate::model::{CellKey, Variant};

/// Line counts keyed by matrix cell.
///
/// Entries are only ever added, and each key can be added once. Iteration
/// follows insertion order, which is the matrix nesting order.
///
/// # Example
///
/// ```
/// use asmbench::{CellKey, ResultTable};
///
/// let key = CellKey {
///     flag_set: String::new(),
///     variant: "Baseline".into(),
///     compiler: "g++".into(),
///     level: "O2".into(),
/// };
///
/// let mut table = ResultTable::new();
/// table.insert(key.clone(), 120).unwrap();
/// assert_eq!(table.get(&key), Some(120));
/// assert!(table.insert(key, 130).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    order: Vec<CellKey>,
    lines: HashMap<CellKey, u64>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the line count of a cell.
    ///
    /// # Errors
    ///
    /// [`BenchError::DuplicateCell`] if the cell already has a measurement.
    pub fn insert(&mut self, key: CellKey, lines: u64) -> Result<()> {
        if self.lines.contains_key(&key) {
            return Err(BenchError::DuplicateCell(key));
        }
        self.lines.insert(key.clone(), lines);
        self.order.push(key);
        Ok(())
    }

    pub fn get(&self, key: &CellKey) -> Option<u64> {
        self.lines.get(key).copied()
    }

    /// Returns the baseline measurement for the same flag set, compiler and
    /// level as `key`.
    pub fn baseline_for(&self, key: &CellKey, baseline: &Variant) -> Result<u64> {
        let baseline_key = key.with_variant(baseline);
        self.get(&baseline_key)
            .ok_or(BenchError::MissingBaseline(baseline_key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over `(key, lines)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, u64)> + '_ {
        self.order.iter().map(move |key| (key, self.lines[key]))
    }
}
