//! Structured logging for the harness
//!
//! A `log` backend with timestamped, coloured console output, an optional
//! plain-text log file and per-category debug selection.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, Once, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::LogLevel;

/// Timestamp format for log entries
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Names accepted for [`DebugFlags::from_categories`]
pub const DEBUG_CATEGORIES: [&str; 5] = ["sequencer", "verifier", "runner", "sim", "all"];

/// Global initialization guard
static INIT_LOGGER: Once = Once::new();

/// Debug flag categories for selective logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    pub sequencer: bool, // connection, MTU and pairing steps
    pub verifier: bool,  // profile reads and comparisons
    pub runner: bool,    // class/test lifecycle, suites
    pub sim: bool,       // simulated air and devices
    pub all: bool,
}

impl DebugFlags {
    /// Build flags from category names; unknown names are ignored
    pub fn from_categories<S: AsRef<str>>(categories: &[S]) -> Self {
        let mut flags = Self::default();
        for category in categories {
            match category.as_ref() {
                "sequencer" => flags.sequencer = true,
                "verifier" => flags.verifier = true,
                "runner" => flags.runner = true,
                "sim" => flags.sim = true,
                "all" => flags.all = true,
                _ => {}
            }
        }
        flags
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a debug record logged under `target` passes these flags
    pub fn allows(&self, target: &str) -> bool {
        if self.all || self.is_empty() {
            return true;
        }

        if target.contains("::sequencer") {
            return self.sequencer;
        }
        if target.contains("::verifier") {
            return self.verifier;
        }
        if target.contains("::runner") || target.contains("::suites") {
            return self.runner;
        }
        if target.contains("::sim") {
            return self.sim;
        }
        false
    }
}

/// Global debug flags storage
static DEBUG_FLAGS: RwLock<DebugFlags> = RwLock::new(DebugFlags {
    sequencer: false,
    verifier: false,
    runner: false,
    sim: false,
    all: false,
});

/// Logging setup error
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to set logger: {0}")]
    AlreadyInitialized(String),
}

/// `log` backend used by the harness binary
pub struct HarnessLogger {
    file: Option<Mutex<File>>,
    level: LevelFilter,
    console_output: bool,
}

impl log::Log for HarnessLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }

        if metadata.level() == Level::Debug {
            return should_log_debug(metadata.target());
        }

        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT);

        let level_str = match record.level() {
            Level::Error => "\x1B[31mERROR\x1B[0m",
            Level::Warn => "\x1B[33mWARN \x1B[0m",
            Level::Info => "\x1B[32mINFO \x1B[0m",
            Level::Debug => "\x1B[36mDEBUG\x1B[0m",
            Level::Trace => "\x1B[90mTRACE\x1B[0m",
        };

        let module = record.module_path().unwrap_or("<unknown>");

        if self.console_output {
            let entry = format!("[{}] {} [{}] {}\n", timestamp, level_str, module, record.args());
            let _ = io::stderr().write_all(entry.as_bytes());
        }

        if let Some(file) = &self.file {
            let entry = format!(
                "[{}] {:<5} [{}] [{}:{}] {}\n",
                timestamp,
                record.level(),
                module,
                record.file().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            );
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(entry.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Convert a configured level to a `log` filter
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Install the harness logger; only the first call has an effect
pub fn configure_logging(
    level: LogLevel,
    log_file: Option<PathBuf>,
    console_output: bool,
) -> Result<(), LoggingError> {
    let mut result = Ok(());

    INIT_LOGGER.call_once(|| {
        let file = match log_file.as_ref() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        if let Err(e) = std::fs::create_dir_all(parent) {
                            result = Err(LoggingError::Io(e));
                            return;
                        }
                    }
                }
                match OpenOptions::new().create(true).append(true).open(path) {
                    Ok(file) => Some(Mutex::new(file)),
                    Err(e) => {
                        result = Err(LoggingError::Io(e));
                        return;
                    }
                }
            }
            None => None,
        };

        let logger = Box::new(HarnessLogger {
            file,
            level: level_filter(level),
            console_output,
        });

        if let Err(e) = log::set_boxed_logger(logger) {
            result = Err(LoggingError::AlreadyInitialized(e.to_string()));
            return;
        }

        log::set_max_level(level_filter(level));

        log::info!("Logging initialized at level: {}", level);
        if let Some(path) = &log_file {
            log::info!("Log file: {}", path.display());
        }
    });

    result
}

/// Set global debug flags for selective logging
pub fn set_debug_flags(flags: DebugFlags) {
    if let Ok(mut debug_flags) = DEBUG_FLAGS.write() {
        *debug_flags = flags;
    }
}

/// Check if a debug record from `module_path` passes the category flags
///
/// With no category selected every debug record passes.
pub fn should_log_debug(module_path: &str) -> bool {
    match DEBUG_FLAGS.read() {
        Ok(flags) => flags.allows(module_path),
        Err(_) => true,
    }
}

/// Times one sequencing step and logs its duration at debug level
///
/// Records go out under the caller's `target`, usually `module_path!()`, so
/// they follow the caller's debug category.
pub struct StepTimer {
    target: &'static str,
    scope: String,
    step: &'static str,
    start_time: Instant,
}

impl StepTimer {
    pub fn start(target: &'static str, scope: impl Into<String>, step: &'static str) -> Self {
        let scope = scope.into();
        log::debug!(target: target, "[{}] {} started", scope, step);
        Self {
            target,
            scope,
            step,
            start_time: Instant::now(),
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Stop timing and return the elapsed time
    pub fn finish(self) -> Duration {
        let duration = self.start_time.elapsed();
        log::debug!(target: self.target, "[{}] {} completed in {:?}", self.scope, self.step, duration);
        duration
    }
}
