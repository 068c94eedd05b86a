//! Shared test fixtures for asmbench crates.
//!
//! - [`ScriptedMeasurer`] - a [`Measure`] that returns fixed line counts
//! - [`fake_tools`] - shell scripts standing in for a compiler (unix only)
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! asmbench-test = { workspace = true }
//! ```
//!
//! Integration tests only: unit tests inside `asmbench` would see a second
//! copy of the `Measure` trait.

use std::collections::HashMap;

use asmbench::{BenchError, CellContext, CellKey, Measure, Result};

#[cfg(unix)]
pub mod fake_tools;

/// Returns fixed counts keyed by (variant macro, level flag) and records the
/// cells it was asked about.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMeasurer {
    counts: HashMap<(String, String), u64>,
    calls: Vec<CellKey>,
}

impl ScriptedMeasurer {
    pub fn new(counts: &[(&str, &str, u64)]) -> Self {
        Self {
            counts: counts
                .iter()
                .map(|(m, l, n)| ((m.to_string(), l.to_string()), *n))
                .collect(),
            calls: Vec::new(),
        }
    }

    /// Cells measured so far, in call order.
    pub fn calls(&self) -> &[CellKey] {
        &self.calls
    }
}

impl Measure for ScriptedMeasurer {
    fn measure(&mut self, cell: &CellContext<'_>) -> Result<u64> {
        self.calls.push(cell.key());
        let key = (
            cell.variant.macro_name.clone(),
            cell.level.flag().to_string(),
        );
        self.counts.get(&key).copied().ok_or_else(|| {
            BenchError::Io(std::io::Error::other(format!(
                "no scripted count for {} {}",
                key.0, key.1
            )))
        })
    }
}
