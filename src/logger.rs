//! Logging utilities with colored output and row-streaming progress.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `RowProgress` for periodic row-count/throughput reports during
//!   long-running resource loads
//!
//! # Example
//!
//! ```ignore
//! // Simple logging
//! log!("build"; "loading {} resources", count);
//!
//! // Progress reports for a row stream
//! let mut progress = RowProgress::new("random_names");
//! progress.tick(); // emits at most every PROGRESS_INTERVAL
//! progress.finish(); // always emits a final count/throughput line
//! ```

use crossterm::{
    execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

/// Global verbose flag (set by embedding applications)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Serializes writers so interleaved builds keep whole lines
static OUT: Mutex<()> = Mutex::new(());

/// Interval between periodic progress reports
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(25);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when verbose mode is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let _guard = OUT.lock();
    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "build" => prefix.bright_blue().bold().to_string(),
        "index" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Row Progress
// ============================================================================

/// Periodic progress reporter for long row streams.
///
/// Emits a row-count/throughput line at most once per [`PROGRESS_INTERVAL`]
/// while rows are flowing, and always emits a final line on [`finish`],
/// whether the load succeeded or failed.
///
/// [`finish`]: RowProgress::finish
pub struct RowProgress {
    resource: String,
    started: Instant,
    last_emit: Instant,
    rows: u64,
}

impl RowProgress {
    /// Start tracking a resource load.
    pub fn new(resource: &str) -> Self {
        let now = Instant::now();
        Self {
            resource: resource.to_string(),
            started: now,
            last_emit: now,
            rows: 0,
        }
    }

    /// Record one row; emits a report when the interval has elapsed.
    pub fn tick(&mut self) {
        self.rows += 1;
        if self.last_emit.elapsed() >= PROGRESS_INTERVAL {
            self.emit("loading");
            self.last_emit = Instant::now();
        }
    }

    /// Row count so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Emit the final count/throughput report.
    pub fn finish(&self) {
        self.emit("loaded");
    }

    fn emit(&self, verb: &str) {
        let secs = self.started.elapsed().as_secs_f64().max(f64::EPSILON);
        let rate = self.rows as f64 / secs;
        log(
            "build",
            &format!(
                "{} {}: {} rows ({:.0} rows/s)",
                verb, self.resource, self.rows, rate
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts_rows() {
        let mut progress = RowProgress::new("numbers");
        for _ in 0..42 {
            progress.tick();
        }
        assert_eq!(progress.rows(), 42);
        progress.finish();
    }

    #[test]
    fn test_verbose_flag() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
