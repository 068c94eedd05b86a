//! Report generation for benchmark results.

use std::fmt::{self, Write as _};
use std::io::Write as _;

use asmbench_config::{MarkdownConfig, ToolConfig};
use tracing::debug;

use crate::error::Result;
use crate::model::OptimizationLevel;
use crate::percent::PercentChange;
use crate::process::{Invocation, ProcessRunner};

/// Display token of one cell: the line count, annotated with the change
/// against the baseline for every non-baseline variant.
///
/// ```
/// use asmbench::{cell_token, PercentChange};
///
/// assert_eq!(cell_token(120, None), "120");
/// assert_eq!(cell_token(40, Some(PercentChange::from_tenths(-500))), "40 *(-50.0%)*");
/// ```
pub fn cell_token(lines: u64, change: Option<PercentChange>) -> String {
    match change {
        Some(change) => format!("{} *({})*", lines, change),
        None => lines.to_string(),
    }
}

/// One compiler's tokens across all optimization levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub label: String,
    pub tokens: Vec<String>,
}

impl ReportRow {
    pub fn new(label: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            label: label.into(),
            tokens,
        }
    }

    /// Tokens joined by commas, without the label.
    pub fn cells_csv(&self) -> String {
        self.tokens.join(",")
    }

    /// `label,tok1,tok2,...`
    pub fn to_csv_line(&self) -> String {
        format!("{},{}", self.label, self.cells_csv())
    }
}

/// Header of level labels plus one row per compiler.
///
/// # Example
///
/// ```
/// use asmbench::{CsvBlock, OptimizationLevel, ReportRow};
///
/// let mut csv = CsvBlock::new(&[OptimizationLevel::new("-O0"), OptimizationLevel::new("-O1")]);
/// csv.push_row(ReportRow::new("g++", vec!["100".into(), "80".into()]));
///
/// assert_eq!(csv.to_csv(), ",O0,O1\ng++,100,80");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBlock {
    header: Vec<String>,
    rows: Vec<ReportRow>,
}

impl CsvBlock {
    pub fn new(levels: &[OptimizationLevel]) -> Self {
        Self {
            header: levels.iter().map(|l| l.label().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Renders the block. The header starts with an empty cell above the
    /// compiler labels; there is no trailing newline.
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push(',');
        output.push_str(&self.header.join(","));
        for row in &self.rows {
            output.push('\n');
            output.push_str(&row.to_csv_line());
        }
        output
    }
}

/// Converts a CSV block into a Markdown table.
pub trait TableFormatter {
    fn to_markdown(&self, csv: &CsvBlock) -> Result<String>;
}

/// Renders pipe tables directly.
///
/// # Example
///
/// ```
/// use asmbench::{BuiltinFormatter, CsvBlock, OptimizationLevel, ReportRow, TableFormatter};
///
/// let mut csv = CsvBlock::new(&[OptimizationLevel::new("-O0")]);
/// csv.push_row(ReportRow::new("g++", vec!["7".into()]));
///
/// let md = BuiltinFormatter.to_markdown(&csv).unwrap();
/// assert_eq!(md, "|     | O0  |\n|-----|-----|\n| g++ | 7   |\n");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormatter;

impl TableFormatter for BuiltinFormatter {
    fn to_markdown(&self, csv: &CsvBlock) -> Result<String> {
        let mut table: Vec<Vec<&str>> = Vec::with_capacity(csv.rows.len() + 1);
        table.push(
            std::iter::once("")
                .chain(csv.header.iter().map(String::as_str))
                .collect(),
        );
        for row in &csv.rows {
            table.push(
                std::iter::once(row.label.as_str())
                    .chain(row.tokens.iter().map(String::as_str))
                    .collect(),
            );
        }

        let columns = table.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|c| {
                table
                    .iter()
                    .filter_map(|r| r.get(c))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut output = String::new();
        for (i, row) in table.iter().enumerate() {
            output.push('|');
            for (c, width) in widths.iter().enumerate() {
                let cell = row.get(c).copied().unwrap_or("");
                let pad = width - cell.chars().count();
                write!(output, " {}{} |", cell, " ".repeat(pad)).unwrap();
            }
            output.push('\n');

            if i == 0 {
                output.push('|');
                for width in &widths {
                    write!(output, "{}|", "-".repeat(width + 2)).unwrap();
                }
                output.push('\n');
            }
        }

        Ok(output)
    }
}

/// Pipes the CSV through an external converter such as `csvtomd`.
///
/// The CSV is written to a temporary file passed as the last argument. Each
/// line of the converter's output gets a leading `|`, since `csvtomd` emits
/// tables without an outer border.
#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    tool: ToolConfig,
    runner: ProcessRunner,
}

impl ExternalFormatter {
    pub fn new(tool: ToolConfig, runner: ProcessRunner) -> Self {
        Self { tool, runner }
    }
}

impl TableFormatter for ExternalFormatter {
    fn to_markdown(&self, csv: &CsvBlock) -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("asmbench-")
            .suffix(".csv")
            .tempfile()?;
        writeln!(file, "{}", csv.to_csv())?;
        file.flush()?;

        let invocation = Invocation::new(&self.tool.command)
            .args(&self.tool.args)
            .arg(file.path());
        debug!(event = "format", command = %invocation);

        let output = self.runner.run(&invocation)?.require_success()?;
        Ok(prefix_lines(output.stdout_text()?))
    }
}

fn prefix_lines(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| format!("|{}", line))
        .collect()
}

/// The formatter selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredFormatter {
    External(ExternalFormatter),
    Builtin(BuiltinFormatter),
}

impl ConfiguredFormatter {
    pub fn from_config(config: &MarkdownConfig, runner: ProcessRunner) -> Self {
        match config {
            MarkdownConfig::External(tool) => {
                ConfiguredFormatter::External(ExternalFormatter::new(tool.clone(), runner))
            }
            MarkdownConfig::Builtin => ConfiguredFormatter::Builtin(BuiltinFormatter),
        }
    }
}

impl TableFormatter for ConfiguredFormatter {
    fn to_markdown(&self, csv: &CsvBlock) -> Result<String> {
        match self {
            ConfiguredFormatter::External(f) => f.to_markdown(csv),
            ConfiguredFormatter::Builtin(f) => f.to_markdown(csv),
        }
    }
}

/// One variant's section of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBlock {
    /// Variant label followed by the flag-set label.
    pub heading: String,
    pub csv: CsvBlock,
    pub markdown: String,
}

/// The rendered report: one block per (flag set, variant).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub blocks: Vec<ReportBlock>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: ReportBlock) {
        self.blocks.push(block);
    }

    pub fn block(&self, heading: &str) -> Option<&ReportBlock> {
        self.blocks.iter().find(|b| b.heading == heading)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "**{}**", block.heading)?;
            writeln!(f)?;
            writeln!(f, "{}", block.markdown.trim_end())?;
            writeln!(f)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<OptimizationLevel> {
        ["-O0", "-O1"].into_iter().map(OptimizationLevel::new).collect()
    }

    fn sample_block() -> CsvBlock {
        let mut csv = CsvBlock::new(&levels());
        csv.push_row(ReportRow::new(
            "g++ 7.0.0",
            vec![cell_token(100, Some(PercentChange::ZERO)), cell_token(40, Some(PercentChange::from_tenths(-500)))],
        ));
        csv.push_row(ReportRow::new("clang++", vec!["90".into(), "50".into()]));
        csv
    }

    #[test]
    fn test_csv_layout() {
        assert_eq!(
            sample_block().to_csv(),
            ",O0,O1\ng++ 7.0.0,100 *(+0.0%)*,40 *(-50.0%)*\nclang++,90,50"
        );
    }

    #[test]
    fn test_row_cells() {
        let csv = sample_block();
        assert_eq!(csv.rows()[0].cells_csv(), "100 *(+0.0%)*,40 *(-50.0%)*");
        assert_eq!(csv.header(), ["O0".to_string(), "O1".to_string()]);
    }

    #[test]
    fn test_builtin_table_shape() {
        let md = BuiltinFormatter.to_markdown(&sample_block()).unwrap();
        let lines: Vec<&str> = md.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].chars().all(|c| c == '|' || c == '-'));
        for line in &lines {
            assert!(line.starts_with('|') && line.ends_with('|'));
            assert_eq!(line.matches('|').count(), 4);
            assert_eq!(line.chars().count(), lines[0].chars().count());
        }
        assert!(lines[2].contains("40 *(-50.0%)*"));
    }

    #[test]
    fn test_prefix_lines() {
        assert_eq!(prefix_lines("a | b\n--|--\n1 | 2\n"), "|a | b\n|--|--\n|1 | 2\n");
        assert_eq!(prefix_lines("x"), "|x");
        assert_eq!(prefix_lines(""), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_external_formatter_reads_csv_file() {
        let formatter = ExternalFormatter::new(ToolConfig::new("cat"), ProcessRunner::new());
        let md = formatter.to_markdown(&sample_block()).unwrap();
        assert_eq!(
            md,
            "|,O0,O1\n|g++ 7.0.0,100 *(+0.0%)*,40 *(-50.0%)*\n|clang++,90,50\n"
        );
    }

    #[test]
    fn test_report_display() {
        let mut report = Report::new();
        report.push(ReportBlock {
            heading: "Baseline".into(),
            csv: CsvBlock::new(&levels()),
            markdown: "|a|\n".into(),
        });
        report.push(ReportBlock {
            heading: "Curry".into(),
            csv: CsvBlock::new(&levels()),
            markdown: "|b|".into(),
        });

        assert_eq!(
            report.to_string(),
            "**Baseline**\n\n|a|\n\n\n**Curry**\n\n|b|\n\n\n"
        );
        assert!(report.block("Curry").is_some());
        assert!(report.block("Lambda").is_none());
    }
}
