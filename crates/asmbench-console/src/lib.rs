//! Colorful stderr diagnostics for benchmark runs.
//!
//! Provides a custom `tracing` layer that formats driver events with colors.
//! Standard output stays reserved for the Markdown report.
//!
//! ## Log Levels
//!
//! - **INFO**: run start/end, compiler command lines, measured line counts,
//!   stripped assembly text
//! - **DEBUG**: per-cell results, converter commands
//! - **TRACE**: every spawned process

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Package version for banner display.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directive applied when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "asmbench=info";

/// Initializes console diagnostics.
///
/// Safe to call multiple times - only the first call has effect.
/// Prints a one-line banner to stderr and sets up tracing.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ConsoleLayer)
            .try_init();
    });
}

fn print_banner() {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(
        stderr,
        "{} {}",
        "asmbench".bright_cyan().bold(),
        format!("v{} - stripped assembly size benchmarks", VERSION).bright_white()
    );
    let _ = stderr.flush();
}

/// A tracing layer that formats asmbench events with colors.
pub struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        if !metadata.target().starts_with("asmbench") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stderr(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    message: Option<String>,
    command: Option<String>,
    source: Option<String>,
    formula: Option<String>,
    text: Option<String>,
    compiler: Option<String>,
    variant: Option<String>,
    flag_set: Option<String>,
    level: Option<String>,
    change: Option<String>,
    stderr: Option<String>,
    lines: Option<u64>,
    cells: Option<u64>,
    duration_ms: Option<u64>,
}

impl EventVisitor {
    fn set_str(&mut self, name: &str, value: String) {
        let slot = match name {
            "event" => &mut self.event,
            "message" => &mut self.message,
            "command" => &mut self.command,
            "source" => &mut self.source,
            "formula" => &mut self.formula,
            "text" => &mut self.text,
            "compiler" => &mut self.compiler,
            "variant" => &mut self.variant,
            "flag_set" => &mut self.flag_set,
            "level" => &mut self.level,
            "change" => &mut self.change,
            "stderr" => &mut self.stderr,
            _ => return,
        };
        *slot = Some(value);
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // Display-captured fields (`%value`) arrive here already formatted.
        self.set_str(field.name(), format!("{:?}", value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "lines" => self.lines = Some(value),
            "cells" => self.cells = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_str(field.name(), value.to_string());
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "run_start" => format_run_start(v),
        "run_end" => format_run_end(v),
        "compile" => format_compile(v),
        "measure" => format_measure(v),
        "stripped" => format_stripped(v),
        "cell" => format_cell(v),
        "compiler_stderr" => format_compiler_stderr(v),
        "format" | "spawn" => format_command(v),
        _ => format_message(v, level),
    }
}

fn format_run_start(v: &EventVisitor) -> String {
    let cells = v.cells.unwrap_or(0);
    let mut output = format!(
        "{} Benchmarking {} │ {} cells",
        "▶".bright_green().bold(),
        v.source.as_deref().unwrap_or("?").white().bold(),
        cells.to_formatted_string(&Locale::en).bright_yellow(),
    );
    if let Some(formula) = &v.formula {
        output.push_str(&format!(" │ {}", formula.bright_magenta()));
    }
    output
}

fn format_run_end(v: &EventVisitor) -> String {
    format!(
        "{} Measured {} cells in {}",
        "■".bright_cyan().bold(),
        v.cells
            .unwrap_or(0)
            .to_formatted_string(&Locale::en)
            .bright_yellow(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
    )
}

fn format_compile(v: &EventVisitor) -> String {
    format!(
        "{} {}",
        "$".bright_blue(),
        v.command.as_deref().unwrap_or("")
    )
}

fn format_measure(v: &EventVisitor) -> String {
    format!(
        "  {} {} lines",
        "=".bright_black(),
        v.lines
            .unwrap_or(0)
            .to_formatted_string(&Locale::en)
            .bright_magenta()
            .bold()
    )
}

fn format_stripped(v: &EventVisitor) -> String {
    // Blank lines separate one cell's assembly from the next command.
    let text = v.text.as_deref().unwrap_or("").trim_end_matches('\n');
    format!("{}\n\n\n", text.bright_black())
}

fn format_cell(v: &EventVisitor) -> String {
    let change = v.change.as_deref().unwrap_or("");
    let change = if change.starts_with('-') {
        change.bright_green().to_string()
    } else if change.is_empty() || change == "+0.0%" {
        change.white().to_string()
    } else {
        change.bright_red().to_string()
    };

    format!(
        "  {} {}{} │ {} │ {} │ {} {}",
        "·".bright_black(),
        v.variant.as_deref().unwrap_or("?").white().bold(),
        v.flag_set.as_deref().unwrap_or(""),
        v.compiler.as_deref().unwrap_or("?"),
        v.level.as_deref().unwrap_or("?").bright_blue(),
        v.lines
            .unwrap_or(0)
            .to_formatted_string(&Locale::en)
            .bright_yellow(),
        change,
    )
}

fn format_compiler_stderr(v: &EventVisitor) -> String {
    format!(
        "{} {} wrote to stderr:\n{}",
        "!".bright_yellow().bold(),
        v.compiler.as_deref().unwrap_or("compiler"),
        v.stderr.as_deref().unwrap_or("")
    )
}

fn format_command(v: &EventVisitor) -> String {
    format!(
        "  {} {}",
        "$".bright_black(),
        v.command.as_deref().unwrap_or("").bright_black()
    )
}

fn format_message(v: &EventVisitor, level: Level) -> String {
    let Some(message) = v.message.as_deref() else {
        return String::new();
    };
    match level {
        Level::ERROR => format!("{} {}", "error:".bright_red().bold(), message),
        Level::WARN => format!("{} {}", "warning:".bright_yellow().bold(), message),
        _ => message.to_string(),
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}
