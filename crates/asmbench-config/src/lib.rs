//! Configuration system for asmbench.
//!
//! Describe the benchmark matrix (compilers, optimization levels, macro
//! variants, flag sets) and the external tools in TOML or YAML, or build it in
//! code starting from the built-in default matrix.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use asmbench_config::{FormulaConfig, MatrixConfig};
//!
//! let config = MatrixConfig::from_toml_str(r#"
//!     optimization_levels = ["-O0", "-O2"]
//!     formula = "relative_to_measurement"
//!
//!     [[compilers]]
//!     label = "clang++ 17"
//!     command = "/usr/bin/clang++"
//!
//!     [[variants]]
//!     label = "Baseline"
//!     macro = "VR_BASELINE"
//!
//!     [[variants]]
//!     label = "Function pointer"
//!     macro = "VR_FN_PTR"
//! "#).unwrap();
//!
//! assert_eq!(config.variants.len(), 2);
//! assert_eq!(config.formula, FormulaConfig::RelativeToMeasurement);
//! // Fields left out fall back to the built-in matrix.
//! assert_eq!(config.flag_sets.len(), 1);
//! ```
//!
//! Use the default matrix when no file is given:
//!
//! ```
//! use asmbench_config::MatrixConfig;
//!
//! let config = MatrixConfig::default();
//! assert_eq!(config.baseline().unwrap().label, "Baseline");
//! assert!(config.validate().is_ok());
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Flags passed to every compiler invocation before the per-cell arguments.
pub const DEFAULT_COMPILER_FLAGS: &[&str] = &[
    "-std=c++1z",
    "-S",
    "-W",
    "-Wall",
    "-Wextra",
    "-Wpedantic",
    "-fdiagnostics-color=always",
    "-DNDEBUG",
];

/// Optimization levels benchmarked by the default matrix.
pub const DEFAULT_OPTIMIZATION_LEVELS: &[&str] = &["-O0", "-O1", "-O2", "-O3", "-Ofast"];

/// Full benchmark matrix configuration.
///
/// Every field has a default, so a file only needs to name what differs from
/// the built-in matrix.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MatrixConfig {
    /// Compilers to benchmark, in report order.
    pub compilers: Vec<CompilerConfig>,

    /// Optimization level flags, in column order.
    pub optimization_levels: Vec<String>,

    /// Macro variants. The first one is the baseline.
    pub variants: Vec<VariantConfig>,

    /// Extra flag sets forming the outermost matrix dimension.
    pub flag_sets: Vec<FlagSetConfig>,

    /// Flags passed to the compiler on every invocation.
    pub compiler_flags: Vec<String>,

    /// Percentage-change formula used for non-baseline variants.
    pub formula: FormulaConfig,

    /// Abort the run when the compiler writes anything to stderr.
    pub fail_on_compiler_stderr: bool,

    /// External tool commands.
    pub tools: ToolsConfig,

    /// Per-invocation timeout in seconds. No timeout when absent.
    pub timeout_secs: Option<u64>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            compilers: vec![CompilerConfig::new("g++", "g++")],
            optimization_levels: DEFAULT_OPTIMIZATION_LEVELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            variants: vec![
                VariantConfig::new("Baseline", "VR_BASELINE"),
                VariantConfig::new("Curry", "VR_CURRY"),
            ],
            flag_sets: vec![FlagSetConfig::default()],
            compiler_flags: DEFAULT_COMPILER_FLAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            formula: FormulaConfig::default(),
            fail_on_compiler_stderr: true,
            tools: ToolsConfig::default(),
            timeout_secs: None,
        }
    }
}

impl MatrixConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as TOML.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or fails to parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Replaces the compiler list.
    pub fn with_compilers(mut self, compilers: Vec<CompilerConfig>) -> Self {
        self.compilers = compilers;
        self
    }

    /// Replaces the variant list. The first variant becomes the baseline.
    pub fn with_variants(mut self, variants: Vec<VariantConfig>) -> Self {
        self.variants = variants;
        self
    }

    /// Replaces the optimization levels.
    pub fn with_optimization_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optimization_levels = levels.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the flag sets.
    pub fn with_flag_sets(mut self, flag_sets: Vec<FlagSetConfig>) -> Self {
        self.flag_sets = flag_sets;
        self
    }

    /// Replaces the base compiler flags.
    pub fn with_compiler_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compiler_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the percentage-change formula.
    pub fn with_formula(mut self, formula: FormulaConfig) -> Self {
        self.formula = formula;
        self
    }

    /// Sets the strip filter command.
    pub fn with_strip_tool(mut self, tool: ToolConfig) -> Self {
        self.tools.strip = tool;
        self
    }

    /// Sets how CSV blocks become Markdown tables.
    pub fn with_markdown(mut self, markdown: MarkdownConfig) -> Self {
        self.tools.markdown = markdown;
        self
    }

    /// Sets the per-invocation timeout.
    pub fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    /// Sets whether compiler stderr output aborts the run.
    pub fn with_fail_on_compiler_stderr(mut self, fail: bool) -> Self {
        self.fail_on_compiler_stderr = fail;
        self
    }

    /// Returns the per-invocation timeout, if configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use asmbench_config::MatrixConfig;
    /// use std::time::Duration;
    ///
    /// let config = MatrixConfig::from_toml_str("timeout_secs = 30").unwrap();
    /// assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    /// assert_eq!(MatrixConfig::default().timeout(), None);
    /// ```
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }

    /// Returns the baseline variant (the first one).
    pub fn baseline(&self) -> Option<&VariantConfig> {
        self.variants.first()
    }

    /// Number of cells the matrix produces.
    pub fn cell_count(&self) -> usize {
        self.flag_sets.len()
            * self.variants.len()
            * self.compilers.len()
            * self.optimization_levels.len()
    }

    /// Checks the matrix for structural problems.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a dimension is empty, labels
    /// repeat within a dimension, a command is blank, a level flag does not
    /// start with `-`, or a compiler label or level contains a comma or line
    /// break (both end up as unquoted CSV fields).
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty("compilers", self.compilers.len())?;
        non_empty("optimization_levels", self.optimization_levels.len())?;
        non_empty("variants", self.variants.len())?;
        non_empty("flag_sets", self.flag_sets.len())?;

        unique_labels("compiler", self.compilers.iter().map(|c| c.label.as_str()))?;
        unique_labels("variant", self.variants.iter().map(|v| v.label.as_str()))?;
        unique_labels("flag set", self.flag_sets.iter().map(|f| f.label.as_str()))?;
        unique_labels(
            "optimization level",
            self.optimization_levels.iter().map(String::as_str),
        )?;

        plain_fields("compiler", self.compilers.iter().map(|c| c.label.as_str()))?;
        plain_fields(
            "optimization level",
            self.optimization_levels.iter().map(String::as_str),
        )?;

        for compiler in &self.compilers {
            if compiler.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "compiler '{}' has an empty command",
                    compiler.label
                )));
            }
        }

        for variant in &self.variants {
            if variant.macro_name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "variant '{}' has an empty macro name",
                    variant.label
                )));
            }
        }

        for level in &self.optimization_levels {
            if !level.starts_with('-') || level.len() < 2 {
                return Err(ConfigError::Invalid(format!(
                    "optimization level '{}' must be a flag such as -O2",
                    level
                )));
            }
        }

        if self.tools.strip.command.trim().is_empty() {
            return Err(ConfigError::Invalid("strip tool has an empty command".into()));
        }

        if let MarkdownConfig::External(tool) = &self.tools.markdown {
            if tool.command.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "markdown converter has an empty command".into(),
                ));
            }
        }

        Ok(())
    }
}

fn non_empty(dimension: &str, len: usize) -> Result<(), ConfigError> {
    if len == 0 {
        Err(ConfigError::Invalid(format!("{} must not be empty", dimension)))
    } else {
        Ok(())
    }
}

fn unique_labels<'a>(
    kind: &str,
    labels: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(ConfigError::Invalid(format!(
                "duplicate {} label '{}'",
                kind, label
            )));
        }
    }
    Ok(())
}

fn plain_fields<'a>(
    kind: &str,
    labels: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    for label in labels {
        if label.contains([',', '\n', '\r']) {
            return Err(ConfigError::Invalid(format!(
                "{} label '{}' must not contain commas or line breaks",
                kind,
                label.escape_default()
            )));
        }
    }
    Ok(())
}

/// A compiler under benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CompilerConfig {
    /// Label shown in the report rows.
    pub label: String,

    /// Executable to run.
    pub command: String,

    /// Arguments placed before every other argument.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CompilerConfig {
    /// Creates a compiler entry without leading arguments.
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Adds leading arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// A preprocessor macro configuration under benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct VariantConfig {
    /// Label shown in the report heading.
    pub label: String,

    /// Macro defined as `-D<macro>=1`.
    #[serde(rename = "macro")]
    pub macro_name: String,
}

impl VariantConfig {
    pub fn new(label: impl Into<String>, macro_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            macro_name: macro_name.into(),
        }
    }
}

/// Extra compiler arguments applied to a whole pass over the matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FlagSetConfig {
    /// Suffix appended to report headings.
    #[serde(default)]
    pub label: String,

    /// Arguments passed after the base flags.
    #[serde(default)]
    pub args: Vec<String>,
}

impl FlagSetConfig {
    pub fn new<I, S>(label: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Percentage-change formula selection.
///
/// The two historical drivers disagree on the denominator, so both stay
/// available by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaConfig {
    /// `(value - baseline) / baseline * 100`
    #[default]
    RelativeToBaseline,

    /// `(value - baseline) / value * 100`
    RelativeToMeasurement,
}

/// External tool commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ToolsConfig {
    /// Assembly stripping filter. Receives the assembly path as last argument.
    pub strip: ToolConfig,

    /// CSV to Markdown conversion.
    pub markdown: MarkdownConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            strip: ToolConfig::new("./stripasm"),
            markdown: MarkdownConfig::default(),
        }
    }
}

/// An external command with fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolConfig {
    /// Executable to run.
    pub command: String,

    /// Arguments placed before the file argument.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// How CSV blocks are turned into Markdown tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkdownConfig {
    /// Pipe the CSV through an external converter such as `csvtomd`.
    External(ToolConfig),

    /// Render the table without any external tool.
    Builtin,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        MarkdownConfig::External(ToolConfig::new("csvtomd"))
    }
}
