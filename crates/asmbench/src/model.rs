//! Matrix dimensions and cell keys.

use std::fmt;

use asmbench_config::{CompilerConfig, FlagSetConfig, MatrixConfig, VariantConfig};

use crate::error::Result;

/// A named preprocessor macro configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub label: String,
    pub macro_name: String,
}

impl Variant {
    pub fn new(label: impl Into<String>, macro_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            macro_name: macro_name.into(),
        }
    }

    /// Compiler argument enabling this variant.
    ///
    /// ```
    /// use asmbench::Variant;
    ///
    /// assert_eq!(Variant::new("Curry", "VR_CURRY").define_arg(), "-DVR_CURRY=1");
    /// ```
    pub fn define_arg(&self) -> String {
        format!("-D{}=1", self.macro_name)
    }
}

impl From<&VariantConfig> for Variant {
    fn from(config: &VariantConfig) -> Self {
        Self::new(&config.label, &config.macro_name)
    }
}

/// A compiler under benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub label: String,
    pub command: String,
    /// Arguments placed before every other argument.
    pub args: Vec<String>,
}

impl Compiler {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
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

impl From<&CompilerConfig> for Compiler {
    fn from(config: &CompilerConfig) -> Self {
        Self::new(&config.label, &config.command).with_args(config.args.iter().cloned())
    }
}

/// An optimization level flag such as `-O2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationLevel {
    flag: String,
}

impl OptimizationLevel {
    pub fn new(flag: impl Into<String>) -> Self {
        Self { flag: flag.into() }
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    /// Column label: the flag without its leading dash.
    ///
    /// ```
    /// use asmbench::OptimizationLevel;
    ///
    /// assert_eq!(OptimizationLevel::new("-Ofast").label(), "Ofast");
    /// ```
    pub fn label(&self) -> &str {
        self.flag.strip_prefix('-').unwrap_or(&self.flag)
    }
}

/// Extra compiler arguments applied to one pass over the matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    /// Suffix appended to report headings.
    pub label: String,
    pub args: Vec<String>,
}

impl From<&FlagSetConfig> for FlagSet {
    fn from(config: &FlagSetConfig) -> Self {
        Self {
            label: config.label.clone(),
            args: config.args.clone(),
        }
    }
}

/// Composite key of one matrix cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub flag_set: String,
    pub variant: String,
    pub compiler: String,
    pub level: String,
}

impl CellKey {
    pub fn new(
        flag_set: &FlagSet,
        variant: &Variant,
        compiler: &Compiler,
        level: &OptimizationLevel,
    ) -> Self {
        Self {
            flag_set: flag_set.label.clone(),
            variant: variant.label.clone(),
            compiler: compiler.label.clone(),
            level: level.label().to_string(),
        }
    }

    /// The same cell for another variant.
    pub fn with_variant(&self, variant: &Variant) -> Self {
        Self {
            variant: variant.label.clone(),
            ..self.clone()
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant)?;
        if !self.flag_set.is_empty() {
            write!(f, "{}", self.flag_set)?;
        }
        write!(f, " / {} / {}", self.compiler, self.level)
    }
}

/// The validated benchmark matrix.
///
/// All four dimensions are non-empty and their labels are unique, so every
/// cell has a distinct [`CellKey`].
#[derive(Debug, Clone)]
pub struct Matrix {
    flag_sets: Vec<FlagSet>,
    variants: Vec<Variant>,
    compilers: Vec<Compiler>,
    levels: Vec<OptimizationLevel>,
}

impl Matrix {
    /// Builds a matrix with a single empty flag set.
    ///
    /// # Errors
    ///
    /// Fails when a dimension is empty or a label repeats.
    ///
    /// ```
    /// use asmbench::{Compiler, Matrix, OptimizationLevel, Variant};
    ///
    /// let matrix = Matrix::new(
    ///     vec![Variant::new("Baseline", "VR_BASELINE"), Variant::new("Curry", "VR_CURRY")],
    ///     vec![Compiler::new("g++", "g++")],
    ///     vec![OptimizationLevel::new("-O0"), OptimizationLevel::new("-O2")],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(matrix.baseline().label, "Baseline");
    /// assert_eq!(matrix.cell_count(), 4);
    /// ```
    pub fn new(
        variants: Vec<Variant>,
        compilers: Vec<Compiler>,
        levels: Vec<OptimizationLevel>,
    ) -> Result<Self> {
        Self::from_config(&dimensions_config(&variants, &compilers, &levels))
    }

    /// Builds the matrix described by a configuration.
    pub fn from_config(config: &MatrixConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            flag_sets: config.flag_sets.iter().map(FlagSet::from).collect(),
            variants: config.variants.iter().map(Variant::from).collect(),
            compilers: config.compilers.iter().map(Compiler::from).collect(),
            levels: config
                .optimization_levels
                .iter()
                .map(OptimizationLevel::new)
                .collect(),
        })
    }

    pub fn flag_sets(&self) -> &[FlagSet] {
        &self.flag_sets
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn compilers(&self) -> &[Compiler] {
        &self.compilers
    }

    pub fn levels(&self) -> &[OptimizationLevel] {
        &self.levels
    }

    /// The reference variant: the first one.
    pub fn baseline(&self) -> &Variant {
        &self.variants[0]
    }

    pub fn cell_count(&self) -> usize {
        self.flag_sets.len() * self.variants.len() * self.compilers.len() * self.levels.len()
    }
}

/// Default configuration restricted to the given dimensions and a single
/// empty flag set.
pub(crate) fn dimensions_config(
    variants: &[Variant],
    compilers: &[Compiler],
    levels: &[OptimizationLevel],
) -> MatrixConfig {
    MatrixConfig::new()
        .with_variants(
            variants
                .iter()
                .map(|v| VariantConfig::new(&v.label, &v.macro_name))
                .collect(),
        )
        .with_compilers(
            compilers
                .iter()
                .map(|c| CompilerConfig::new(&c.label, &c.command).with_args(c.args.clone()))
                .collect(),
        )
        .with_optimization_levels(levels.iter().map(|l| l.flag().to_string()))
        .with_flag_sets(vec![FlagSetConfig::default()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    #[test]
    fn test_level_label_strips_dash() {
        assert_eq!(OptimizationLevel::new("-O3").label(), "O3");
        assert_eq!(OptimizationLevel::new("-O3").flag(), "-O3");
    }

    #[test]
    fn test_cell_key_with_variant() {
        let key = CellKey::new(
            &FlagSet::default(),
            &Variant::new("Curry", "VR_CURRY"),
            &Compiler::new("g++", "g++"),
            &OptimizationLevel::new("-O1"),
        );
        let baseline = key.with_variant(&Variant::new("Baseline", "VR_BASELINE"));

        assert_eq!(baseline.variant, "Baseline");
        assert_eq!(baseline.compiler, "g++");
        assert_eq!(baseline.level, "O1");
        assert_eq!(key.to_string(), "Curry / g++ / O1");
    }

    #[test]
    fn test_matrix_rejects_empty_variants() {
        let result = Matrix::new(
            vec![],
            vec![Compiler::new("g++", "g++")],
            vec![OptimizationLevel::new("-O0")],
        );
        assert!(matches!(result, Err(BenchError::Config(_))));
    }

    #[test]
    fn test_matrix_from_config_keeps_order() {
        let config = MatrixConfig::default();
        let matrix = Matrix::from_config(&config).unwrap();

        let labels: Vec<_> = matrix.levels().iter().map(|l| l.label()).collect();
        assert_eq!(labels, vec!["O0", "O1", "O2", "O3", "Ofast"]);
        assert_eq!(matrix.baseline().macro_name, "VR_BASELINE");
        assert_eq!(matrix.cell_count(), config.cell_count());
    }
}
