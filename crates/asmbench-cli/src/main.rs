//! `asmbench` command-line driver.
//!
//! Prints the Markdown report on stdout; diagnostics go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use asmbench::config::{ConfigError, FormulaConfig, MarkdownConfig, MatrixConfig};
use asmbench::{CancellationToken, Report};
use clap::{Parser, ValueEnum};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "asmbench",
    version,
    about = "Compare stripped assembly size across macro variants, compilers and optimization levels"
)]
struct Cli {
    /// Source file compiled for every matrix cell
    #[arg()]
    source: PathBuf,

    /// Matrix configuration (TOML, or YAML for .yaml/.yml files)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Denominator of the percentage change
    #[arg(long, value_enum)]
    formula: Option<FormulaArg>,

    /// Render tables without the external CSV-to-Markdown converter
    #[arg(long)]
    builtin_table: bool,

    /// Kill any external tool that runs longer than this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormulaArg {
    /// (value - baseline) / baseline
    RelativeToBaseline,
    /// (value - baseline) / value
    RelativeToMeasurement,
}

impl From<FormulaArg> for FormulaConfig {
    fn from(arg: FormulaArg) -> Self {
        match arg {
            FormulaArg::RelativeToBaseline => FormulaConfig::RelativeToBaseline,
            FormulaArg::RelativeToMeasurement => FormulaConfig::RelativeToMeasurement,
        }
    }
}

/// Loads the configuration file, if any, and applies command-line overrides.
fn resolve_config(cli: &Cli) -> Result<MatrixConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => MatrixConfig::load(path)?,
        None => MatrixConfig::default(),
    };

    if let Some(formula) = cli.formula {
        config = config.with_formula(formula.into());
    }
    if cli.builtin_table {
        config = config.with_markdown(MarkdownConfig::Builtin);
    }
    if let Some(seconds) = cli.timeout_secs {
        config = config.with_timeout_secs(seconds);
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> asmbench::Result<Report> {
    let config = resolve_config(cli)?;
    debug!(cells = config.cell_count() as u64, "configuration resolved");
    asmbench::run_with_config(&config, &cli.source, CancellationToken::new())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    asmbench_console::init();

    match run(&cli) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["asmbench"]).is_err());
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["asmbench", "curry.cpp"]).unwrap();
        assert_eq!(cli.source, PathBuf::from("curry.cpp"));

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config, MatrixConfig::default());
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from([
            "asmbench",
            "fn.cpp",
            "--formula",
            "relative-to-measurement",
            "--builtin-table",
            "--timeout-secs",
            "90",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.formula, FormulaConfig::RelativeToMeasurement);
        assert_eq!(config.tools.markdown, MarkdownConfig::Builtin);
        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_unknown_formula_rejected() {
        let result = Cli::try_parse_from(["asmbench", "fn.cpp", "--formula", "average"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.toml");
        std::fs::write(
            &path,
            r#"
                optimization_levels = ["-O2"]
                formula = "relative_to_measurement"

                [[variants]]
                label = "Baseline"
                macro = "VR_BASELINE"
            "#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "asmbench",
            "x.cpp",
            "--config",
            path.to_str().unwrap(),
            "--formula",
            "relative-to-baseline",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.optimization_levels, vec!["-O2".to_string()]);
        assert_eq!(config.variants.len(), 1);
        assert_eq!(config.formula, FormulaConfig::RelativeToBaseline);
    }

    #[test]
    fn test_invalid_config_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.toml");
        std::fs::write(&path, "variants = []\n").unwrap();

        let cli =
            Cli::try_parse_from(["asmbench", "x.cpp", "-c", path.to_str().unwrap()]).unwrap();
        assert!(matches!(resolve_config(&cli), Err(ConfigError::Invalid(_))));
    }
}
