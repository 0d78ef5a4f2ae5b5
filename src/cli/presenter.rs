//! CLI presenter for output formatting

use std::io::{self, Write};
use std::time::Duration as StdDuration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::recording::AudioAsset;

/// Presenter for CLI output formatting
#[derive(Default)]
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.red} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(StdDuration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        } else {
            self.success(message);
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.spinner.is_some()
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print the key bindings that apply right now
    pub fn hint(&self, keys: &[(&str, &str)]) {
        let line = keys
            .iter()
            .map(|(key, action)| format!("[{}] {}", key.bold(), action))
            .collect::<Vec<_>>()
            .join("  ");
        eprintln!("{}", line.dimmed());
    }

    /// Show one countdown number
    pub fn countdown(&self, remaining: u32) {
        eprint!("{} ", format!("{}…", remaining).yellow().bold());
        let _ = io::stderr().flush();
    }

    pub fn recording_started(&mut self) {
        eprintln!();
        self.start_spinner("Recording...");
    }

    /// Update the recording spinner with elapsed time against the limit
    pub fn update_recording_progress(&self, elapsed: StdDuration, limit: Option<StdDuration>) {
        let message = match limit {
            Some(limit) => format!(
                "Recording... {}",
                self.format_progress(elapsed.as_millis() as u64, limit.as_millis() as u64)
            ),
            None => format!("Recording... {}s", elapsed.as_secs()),
        };
        self.update_spinner(&message);
    }

    pub fn recording_stopped(&mut self, asset: &AudioAsset) {
        let message = format!(
            "Recorded {} ({})",
            format_seconds(asset.duration()),
            asset.human_readable_size()
        );
        self.spinner_success(&message);
    }

    /// Format recording progress bar
    pub fn format_progress(&self, elapsed_ms: u64, total_ms: u64) -> String {
        let elapsed_secs = elapsed_ms / 1000;
        let total_secs = total_ms / 1000;
        let percent = if total_ms > 0 {
            (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {:>3}s / {}s",
            "█".repeat(filled).red(),
            "░".repeat(empty),
            elapsed_secs,
            total_secs
        )
    }

    /// One line of `devices` output
    pub fn device(&self, name: &str, is_default: bool) {
        if is_default {
            println!("{} {}", name, "[DEFAULT]".green());
        } else {
            println!("{}", name);
        }
    }
}

/// Render an asset length as seconds with one decimal
pub fn format_seconds(duration: StdDuration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_progress_at_start() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(0, 10000);
        assert!(progress.contains("0s / 10s"));
    }

    #[test]
    fn format_progress_at_half() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(5000, 10000);
        assert!(progress.contains("5s / 10s"));
    }

    #[test]
    fn format_progress_clamps_overrun() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(12000, 10000);
        assert!(progress.contains("12s / 10s"));
        assert!(!progress.contains('░'));
    }

    #[test]
    fn seconds_have_one_decimal() {
        assert_eq!(format_seconds(StdDuration::from_millis(1500)), "1.5s");
        assert_eq!(format_seconds(StdDuration::ZERO), "0.0s");
    }

    #[test]
    fn no_spinner_until_recording() {
        let mut presenter = Presenter::new();
        assert!(!presenter.is_spinning());
        presenter.start_spinner("x");
        assert!(presenter.is_spinning());
        presenter.stop_spinner();
        assert!(!presenter.is_spinning());
    }
}
