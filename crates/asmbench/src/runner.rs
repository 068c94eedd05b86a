//! Benchmark matrix runner.

use std::path::Path;
use std::time::Instant;

use asmbench_config::MatrixConfig;
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::model::{dimensions_config, CellKey, Compiler, Matrix, OptimizationLevel, Variant};
use crate::percent::PercentageFormula;
use crate::process::{CancellationToken, ProcessRunner};
use crate::report::{
    cell_token, ConfiguredFormatter, CsvBlock, Report, ReportBlock, ReportRow, TableFormatter,
};
use crate::result::ResultTable;
use crate::toolchain::{CellContext, Measure, Toolchain};

/// Measurements of a finished matrix, before Markdown conversion.
#[derive(Debug, Clone)]
pub struct MatrixResults {
    pub table: ResultTable,
    /// `(heading, csv)` per flag set and variant, in run order.
    pub blocks: Vec<(String, CsvBlock)>,
}

impl MatrixResults {
    /// Converts every CSV block to Markdown.
    pub fn render<F: TableFormatter>(&self, formatter: &F) -> Result<Report> {
        let mut report = Report::new();
        for (heading, csv) in &self.blocks {
            report.push(ReportBlock {
                heading: heading.clone(),
                csv: csv.clone(),
                markdown: formatter.to_markdown(csv)?,
            });
        }
        Ok(report)
    }
}

/// Walks the matrix in order flag set, variant, compiler, level.
///
/// Measurement is delegated to a [`Measure`] implementation, so the loop runs
/// the same against a real toolchain or a scripted one.
///
/// # Example
///
/// ```
/// use asmbench::{
///     BuiltinFormatter, CellContext, Compiler, Matrix, MatrixRunner, Measure,
///     OptimizationLevel, Variant,
/// };
///
/// struct Fixed;
///
/// impl Measure for Fixed {
///     fn measure(&mut self, cell: &CellContext<'_>) -> asmbench::Result<u64> {
///         Ok(if cell.variant.label == "Baseline" { 100 } else { 50 })
///     }
/// }
///
/// let matrix = Matrix::new(
///     vec![Variant::new("Baseline", "VR_BASELINE"), Variant::new("Curry", "VR_CURRY")],
///     vec![Compiler::new("g++", "g++")],
///     vec![OptimizationLevel::new("-O2")],
/// )
/// .unwrap();
///
/// let results = MatrixRunner::new(matrix).measure("bench.cpp", &mut Fixed).unwrap();
/// assert_eq!(results.table.len(), 2);
///
/// let report = results.render(&BuiltinFormatter).unwrap();
/// assert!(report.block("Curry").unwrap().markdown.contains("50 *(-50.0%)*"));
/// ```
#[derive(Debug, Clone)]
pub struct MatrixRunner {
    matrix: Matrix,
    formula: PercentageFormula,
    cancel: CancellationToken,
}

impl MatrixRunner {
    pub fn new(matrix: Matrix) -> Self {
        Self {
            matrix,
            formula: PercentageFormula::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_formula(mut self, formula: PercentageFormula) -> Self {
        self.formula = formula;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Measures every cell and builds the CSV blocks.
    ///
    /// Stops at the first error; nothing measured so far is returned.
    pub fn measure<M: Measure>(
        &self,
        source: impl AsRef<Path>,
        measurer: &mut M,
    ) -> Result<MatrixResults> {
        let source = source.as_ref();
        let matrix = &self.matrix;
        let baseline = matrix.baseline();
        let started = Instant::now();

        info!(
            event = "run_start",
            source = %source.display(),
            cells = matrix.cell_count() as u64,
            formula = %self.formula,
        );

        let mut table = ResultTable::new();
        let mut blocks = Vec::with_capacity(matrix.flag_sets().len() * matrix.variants().len());

        for flag_set in matrix.flag_sets() {
            for variant in matrix.variants() {
                let is_baseline = variant == baseline;
                let mut csv = CsvBlock::new(matrix.levels());

                for compiler in matrix.compilers() {
                    let mut tokens = Vec::with_capacity(matrix.levels().len());

                    for level in matrix.levels() {
                        if self.cancel.is_cancelled() {
                            return Err(BenchError::Cancelled);
                        }

                        let cell = CellContext {
                            source,
                            flag_set,
                            variant,
                            compiler,
                            level,
                        };
                        let key = cell.key();
                        let lines = measurer.measure(&cell)?;
                        table.insert(key.clone(), lines)?;

                        let change = if is_baseline {
                            None
                        } else {
                            let base = table.baseline_for(&key, baseline)?;
                            Some(self.formula.truncated(lines, base)?)
                        };

                        log_cell(&key, lines, change.map(|c| c.to_string()));
                        tokens.push(cell_token(lines, change));
                    }

                    csv.push_row(ReportRow::new(&compiler.label, tokens));
                }

                blocks.push((format!("{}{}", variant.label, flag_set.label), csv));
            }
        }

        info!(
            event = "run_end",
            cells = table.len() as u64,
            duration_ms = started.elapsed().as_millis() as u64,
        );

        Ok(MatrixResults { table, blocks })
    }

    /// Measures the matrix and renders the report.
    pub fn run<M: Measure, F: TableFormatter>(
        &self,
        source: impl AsRef<Path>,
        measurer: &mut M,
        formatter: &F,
    ) -> Result<Report> {
        self.measure(source, measurer)?.render(formatter)
    }
}

fn log_cell(key: &CellKey, lines: u64, change: Option<String>) {
    debug!(
        event = "cell",
        flag_set = %key.flag_set,
        variant = %key.variant,
        compiler = %key.compiler,
        level = %key.level,
        lines,
        change = change.as_deref().unwrap_or(""),
    );
}

/// Runs a whole benchmark as described by `config`.
///
/// Builds the matrix, a [`Toolchain`] with a fresh temporary assembly file, and
/// the configured Markdown formatter. All external processes share the
/// configured timeout and `cancel`.
pub fn run_with_config(
    config: &MatrixConfig,
    source: impl AsRef<Path>,
    cancel: CancellationToken,
) -> Result<Report> {
    let matrix = Matrix::from_config(config)?;
    let processes = ProcessRunner::new()
        .with_timeout(config.timeout())
        .with_cancellation(cancel.clone());

    let mut toolchain = Toolchain::from_config(config, processes.clone())?;
    let formatter = ConfiguredFormatter::from_config(&config.tools.markdown, processes);

    MatrixRunner::new(matrix)
        .with_formula(config.formula.into())
        .with_cancellation(cancel)
        .run(source, &mut toolchain, &formatter)
}

/// Runs the matrix over `variants`, `compilers` and `levels` with the default
/// flags and tools (`./stripasm`, `csvtomd`). The first variant is the
/// baseline.
///
/// # Errors
///
/// Fails on an invalid matrix or on the first failing compiler, filter or
/// converter invocation.
pub fn run_matrix(
    source_path: impl AsRef<Path>,
    variants: &[Variant],
    compilers: &[Compiler],
    optimization_levels: &[OptimizationLevel],
) -> Result<Report> {
    let config = dimensions_config(variants, compilers, optimization_levels);
    run_with_config(&config, source_path, CancellationToken::new())
}
