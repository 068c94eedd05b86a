//! Code-size benchmarking for C and C++ compilers.
//!
//! asmbench compiles one source file for every cell of a matrix of macro
//! variants, compilers and optimization levels, strips the generated assembly
//! with an external filter, and reports the remaining line counts as Markdown
//! tables. Every non-baseline variant is annotated with its percentage change
//! against the baseline.
//!
//! # Overview
//!
//! - [`Matrix`] holds the validated dimensions; the first variant is the baseline
//! - [`MatrixRunner`] walks the cells in order and builds the CSV blocks
//! - [`Toolchain`] is the [`Measure`] implementation that runs the compiler and
//!   the strip filter through [`ProcessRunner`]
//! - [`PercentageFormula`] names both percentage denominators
//! - [`TableFormatter`] turns CSV blocks into Markdown, either through an
//!   external converter or [`BuiltinFormatter`]
//!
//! # Example
//!
//! ```
//! use asmbench::{PercentageFormula, PercentChange};
//!
//! let change = PercentageFormula::RelativeToBaseline.truncated(40, 80).unwrap();
//! assert_eq!(change, PercentChange::from_tenths(-500));
//! assert_eq!(change.to_string(), "-50.0%");
//! ```
//!
//! Running a configured benchmark end to end:
//!
//! ```text
//! let config = MatrixConfig::load("matrix.toml")?;
//! let report = asmbench::run_with_config(&config, "bench.cpp", CancellationToken::new())?;
//! print!("{}", report);
//! ```

mod error;
mod model;
mod percent;
mod process;
mod report;
mod result;
mod runner;
mod toolchain;

pub use asmbench_config as config;

pub use error::{BenchError, Result};
pub use model::{CellKey, Compiler, FlagSet, Matrix, OptimizationLevel, Variant};
pub use percent::{PercentChange, PercentageFormula};
pub use process::{CancellationToken, Invocation, ProcessOutput, ProcessRunner};
pub use report::{
    cell_token, BuiltinFormatter, ConfiguredFormatter, CsvBlock, ExternalFormatter, Report,
    ReportBlock, ReportRow, TableFormatter,
};
pub use result::ResultTable;
pub use runner::{run_matrix, run_with_config, MatrixResults, MatrixRunner};
pub use toolchain::{count_lines, CellContext, Measure, Toolchain};
