//! Per-subdirectory refresh progress with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Width the subdirectory name is padded to in status lines
pub const PREFIX_LENGTH: usize = 25;

/// Pad or truncate a subdirectory name to [`PREFIX_LENGTH`] - 1 columns
pub fn status_prefix(name: &str) -> String {
    let width = PREFIX_LENGTH - 1;
    let truncated: String = name.chars().take(width).collect();
    format!("{:<width$}", truncated, width = width)
}

/// Progress of one subdirectory refresh.
///
/// Shows a spinner in interactive mode; in CI only the final status is
/// printed, one line per subdirectory.
pub struct RefreshProgress {
    bar: Option<ProgressBar>,
    prefix: String,
}

impl RefreshProgress {
    pub fn new(ctx: &UiContext, name: &str) -> Self {
        let prefix = status_prefix(name);

        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{prefix} {spinner:.cyan} {msg:.dim} {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
            );
            bar.set_prefix(prefix.clone());
            bar.set_message("Downloading...");
            let bar = match ctx.multi() {
                Some(multi) => multi.add(bar),
                None => bar,
            };
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });

        Self { bar, prefix }
    }

    /// Update the status shown next to the spinner
    pub fn set_message(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Finish with a success status
    pub fn finish(&self, message: &str) {
        self.complete(style(message).green().to_string());
    }

    /// Finish with a failure status
    pub fn fail(&self, message: &str) {
        self.complete(style(message).red().to_string());
    }

    fn complete(&self, styled: String) {
        match self.bar {
            Some(ref bar) => {
                bar.set_style(
                    ProgressStyle::with_template("{prefix} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.finish_with_message(styled);
            }
            None => println!("{} {}", self.prefix, styled),
        }
    }
}
