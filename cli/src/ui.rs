//! Shared UI utilities for consistent terminal output.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Standard symbols used throughout the CLI for consistent visual language.
pub mod symbols {
    /// Arrow for action/progress indicators
    pub const ARROW: &str = "→";
    /// Checkmark for success
    pub const SUCCESS: &str = "✓";
    /// X mark for failure
    pub const FAILURE: &str = "✗";
    /// Warning/attention indicator
    pub const WARNING: &str = "!";
    /// Bullet point
    pub const BULLET: &str = "•";
    /// Watching indicator
    pub const ACTIVE: &str = "●";
}

/// Print a step header with the action arrow.
pub fn print_step(message: &str) {
    println!("{} {}", symbols::ARROW.blue().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", symbols::SUCCESS.green().bold(), message);
}

/// Print a failure message.
pub fn print_error(message: &str) {
    println!("{} {}", symbols::FAILURE.red().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", symbols::WARNING.yellow().bold(), message);
}

/// Print a dimmed info line (indented).
pub fn print_info(message: &str) {
    println!("  {}", message.dimmed());
}

/// Print a bulleted, indented line.
pub fn print_bullet(message: &str) {
    println!("  {} {}", symbols::BULLET.dimmed(), message);
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(50).dimmed());
}

/// Create a spinner with a consistent style.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// `3 compiled, 1 skipped, 0 errors` with the non-zero parts colored.
pub fn format_counts(compiled: usize, skipped: usize, errors: usize) -> String {
    let compiled = format!("{compiled} compiled");
    let skipped = format!("{skipped} skipped");
    let errors_text = format!("{errors} error{}", if errors == 1 { "" } else { "s" });
    format!(
        "{}, {}, {}",
        compiled.green(),
        skipped.dimmed(),
        if errors > 0 {
            errors_text.red().bold().to_string()
        } else {
            errors_text.dimmed().to_string()
        }
    )
}

/// Human-readable elapsed time: `850ms` or `2.4s`.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    if elapsed_ms < 1000 {
        format!("{elapsed_ms}ms")
    } else {
        format!("{:.1}s", elapsed_ms as f64 / 1000.0)
    }
}

/// Get the current time formatted for log output.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
