//! Progress bar for conversions.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use nszconv::progress::ProgressReporter;

/// Byte progress bar that also carries the Ctrl+C flag.
///
/// Returning `false` from `on_progress` makes the library cancel the
/// conversion and remove its temporary output.
pub struct CliProgress {
    bar: ProgressBar,
    interrupted: Arc<AtomicBool>,
}

impl CliProgress {
    /// Creates a progress bar labelled with `name`.
    pub fn new(name: &str, quiet: bool, interrupted: Arc<AtomicBool>) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb
        };
        bar.set_prefix(truncate_name(name, 40));

        Self { bar, interrupted }
    }

    /// Returns a handle to the underlying bar.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl ProgressReporter for CliProgress {
    fn on_total(&mut self, total_bytes: u64) {
        self.bar.set_length(total_bytes);
    }

    fn on_progress(&mut self, bytes_written: u64, _total_bytes: u64) -> bool {
        self.bar.set_position(bytes_written);
        !self.interrupted.load(Ordering::SeqCst)
    }

    fn on_entry_start(&mut self, entry_name: &str, _size: u64) {
        self.bar.set_message(truncate_name(entry_name, 40));
    }

    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        if !success {
            self.bar.set_message(format!("{}: failed", truncate_name(entry_name, 40)));
        }
    }
}

/// Shortens a long name to its last `max` characters.
fn truncate_name(name: &str, max: usize) -> String {
    let count = name.chars().count();
    if count > max {
        let tail: String = name.chars().skip(count - (max - 3)).collect();
        format!("...{}", tail)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short.nca", 40), "short.nca");
        let long = "0123456789abcdef0123456789abcdef.cnmt.nca";
        let truncated = truncate_name(long, 20);
        assert_eq!(truncated.chars().count(), 20);
        assert!(truncated.ends_with("cnmt.nca"));
    }

    #[test]
    fn test_interrupt_cancels() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut progress = CliProgress::new("a.nsz", true, Arc::clone(&flag));
        progress.on_total(10);
        assert!(progress.on_progress(5, 10));
        flag.store(true, Ordering::SeqCst);
        assert!(!progress.on_progress(6, 10));
    }
}
