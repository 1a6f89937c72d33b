//! Utils - Common Utilities for CLI Commands
//!
//! Shared output formatting and input parsing used across CLI commands.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::io::Read;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::error::{CliError, CliResult};

// =============================================================================
// Output Formatting
// =============================================================================

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print a header
pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bold().underline());
    println!();
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Formats at most `limit` values, noting how many were left out
pub fn format_values(values: &[i64], limit: usize) -> String {
    let shown: Vec<String> = values.iter().take(limit).map(ToString::to_string).collect();
    let mut out = format!("[{}]", shown.join(", "));
    if values.len() > limit {
        out.push_str(&format!(" ... ({} more)", values.len() - limit));
    }
    out
}

/// Serializes `value` as pretty JSON to `path`
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> CliResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

// =============================================================================
// Input Parsing
// =============================================================================

/// Reads input text from a file, or from stdin when `source` is "-"
pub fn read_input(source: &str) -> CliResult<String> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    if !Path::new(source).is_file() {
        return Err(CliError::InvalidInput(format!("input file not found: {source}")));
    }
    Ok(std::fs::read_to_string(source)?)
}

/// Parses a JSON array of numbers or whitespace/comma separated numbers
pub fn parse_values(content: &str) -> CliResult<Vec<f64>> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| CliError::InvalidInput(format!("expected a JSON array of numbers: {e}")));
    }

    trimmed
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| CliError::InvalidInput(format!("not a number: {token}")))
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
