//! Human-readable rendering of diagnostics for terminals and panels.
//!
//! Colour goes through `colored`, so `colored::control::set_override(false)`
//! (the CLI's `--no-color`) yields plain text.
use std::fmt::Write;

use colored::Colorize;

use crate::diagnostic::{Counts, Diagnostic, Severity, StageKind};

/// Summary line, then one section per stage in stage order.
pub fn render_report(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    let counts = Counts::of(diagnostics);
    if counts.total() == 0 {
        let _ = writeln!(out, "{}", "No issues found".green().bold());
        return out;
    }

    let _ = writeln!(
        out,
        "{} ({}, {}, {})",
        format!("Found {} {}", counts.total(), plural(counts.total(), "issue")).bold(),
        plural_count(counts.errors, "error").red(),
        plural_count(counts.warnings, "warning").yellow(),
        plural_count(counts.infos, "info").blue(),
    );

    for stage in StageKind::ALL {
        let section: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.stage == stage).collect();
        if section.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{} {}", stage.label().bold().underline(), format!("({})", section.len()).dimmed());
        for diagnostic in section {
            render_entry(&mut out, diagnostic);
        }
    }
    out
}

/// One line per diagnostic, no colour.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("{d}\n")).collect()
}

fn render_entry(out: &mut String, diagnostic: &Diagnostic) {
    let badge = match diagnostic.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".blue().bold(),
    };
    let _ = writeln!(out, "  {badge} {} {}", diagnostic.path.to_string().cyan(), diagnostic.message);
    if let Some(value) = &diagnostic.invalid_value {
        let _ = writeln!(out, "      {} {}", "received:".dimmed(), value);
    }
    for suggestion in diagnostic.suggestions.iter().flatten() {
        let _ = writeln!(out, "      {} {}", "hint:".green(), suggestion);
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 { noun.to_string() } else { format!("{noun}s") }
}

fn plural_count(n: usize, noun: &str) -> String {
    format!("{n} {}", plural(n, noun))
}
