//! Measuring one matrix cell: compile to assembly, strip, count lines.

use std::path::Path;

use asmbench_config::{MatrixConfig, ToolConfig, DEFAULT_COMPILER_FLAGS};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{BenchError, Result};
use crate::model::{CellKey, Compiler, FlagSet, OptimizationLevel, Variant};
use crate::process::{Invocation, ProcessRunner};

/// Everything needed to measure one cell.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub source: &'a Path,
    pub flag_set: &'a FlagSet,
    pub variant: &'a Variant,
    pub compiler: &'a Compiler,
    pub level: &'a OptimizationLevel,
}

impl CellContext<'_> {
    pub fn key(&self) -> CellKey {
        CellKey::new(self.flag_set, self.variant, self.compiler, self.level)
    }
}

/// Produces the stripped-assembly line count of a cell.
pub trait Measure {
    fn measure(&mut self, cell: &CellContext<'_>) -> Result<u64>;
}

impl<M: Measure + ?Sized> Measure for &mut M {
    fn measure(&mut self, cell: &CellContext<'_>) -> Result<u64> {
        (**self).measure(cell)
    }
}

/// Measures cells with a real compiler and strip filter.
///
/// Assembly is written to a uniquely named temporary file owned by the
/// toolchain and removed when it is dropped.
#[derive(Debug)]
pub struct Toolchain {
    compiler_flags: Vec<String>,
    strip: ToolConfig,
    fail_on_compiler_stderr: bool,
    runner: ProcessRunner,
    asm: NamedTempFile,
}

impl Toolchain {
    /// Creates a toolchain with the default flags and `./stripasm` filter.
    pub fn new(runner: ProcessRunner) -> Result<Self> {
        Self::from_config(&MatrixConfig::default(), runner)
    }

    /// Creates a toolchain using the flags and strip tool of `config`.
    pub fn from_config(config: &MatrixConfig, runner: ProcessRunner) -> Result<Self> {
        let asm = tempfile::Builder::new()
            .prefix("asmbench-")
            .suffix(".s")
            .tempfile()?;
        Ok(Self {
            compiler_flags: config.compiler_flags.clone(),
            strip: config.tools.strip.clone(),
            fail_on_compiler_stderr: config.fail_on_compiler_stderr,
            runner,
            asm,
        })
    }

    pub fn with_strip_tool(mut self, strip: ToolConfig) -> Self {
        self.strip = strip;
        self
    }

    pub fn with_compiler_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compiler_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Path the compiler writes assembly to.
    pub fn asm_path(&self) -> &Path {
        self.asm.path()
    }

    /// Builds the compiler command for a cell.
    ///
    /// Order: leading compiler args, base flags, `-o <asm>`, flag-set args,
    /// level flag, variant define, source.
    pub fn compile_invocation(&self, cell: &CellContext<'_>) -> Invocation {
        Invocation::new(&cell.compiler.command)
            .args(&cell.compiler.args)
            .args(&self.compiler_flags)
            .arg("-o")
            .arg(self.asm_path())
            .args(&cell.flag_set.args)
            .arg(cell.level.flag())
            .arg(cell.variant.define_arg())
            .arg(cell.source)
    }

    /// Builds the strip filter command.
    pub fn strip_invocation(&self) -> Invocation {
        Invocation::new(&self.strip.command)
            .args(&self.strip.args)
            .arg(self.asm_path())
    }

    fn compile(&self, cell: &CellContext<'_>) -> Result<()> {
        let invocation = self.compile_invocation(cell);
        info!(event = "compile", command = %invocation);

        let output = self.runner.run(&invocation)?;

        if !output.stderr.is_empty() {
            let stderr = output.stderr_lossy().into_owned();
            if self.fail_on_compiler_stderr {
                return Err(BenchError::CompilerDiagnostics {
                    compiler: cell.compiler.label.clone(),
                    command: invocation.to_string(),
                    stderr,
                });
            }
            warn!(
                event = "compiler_stderr",
                compiler = %cell.compiler.label,
                stderr = %stderr.trim_end()
            );
        }

        if !output.status.success() {
            return Err(BenchError::CompilerFailed {
                compiler: cell.compiler.label.clone(),
                command: invocation.to_string(),
                status: output.status,
            });
        }

        Ok(())
    }

    fn strip(&self) -> Result<String> {
        let invocation = self.strip_invocation();
        let output = self.runner.run(&invocation)?.require_success()?;
        Ok(output.stdout_text()?.to_string())
    }
}

impl Measure for Toolchain {
    fn measure(&mut self, cell: &CellContext<'_>) -> Result<u64> {
        self.compile(cell)?;
        let stripped = self.strip()?;
        let lines = count_lines(&stripped);

        info!(event = "measure", lines);
        info!(event = "stripped", text = %stripped);

        Ok(lines)
    }
}

/// Number of newline characters, as `wc -l` counts them.
///
/// ```
/// use asmbench::count_lines;
///
/// assert_eq!(count_lines("main:\n\tret\n"), 2);
/// assert_eq!(count_lines("no newline"), 0);
/// assert_eq!(count_lines(""), 0);
/// ```
pub fn count_lines(text: &str) -> u64 {
    text.bytes().filter(|&b| b == b'\n').count() as u64
}
