//! Internal diagnostic log
//!
//! The crate records its own behaviour (registration changes, contained
//! handler panics, config loading) to a file in the temp dir. It never logs
//! through a dispatcher, so a broken handler cannot feed back into itself.
//!
//! Disabled unless `MODLOG_DEBUG` is `1` or `true`. The minimum level comes
//! from `MODLOG_LOG_LEVEL` (`trace`, `debug`, `info`, `warn`, `error`).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Diagnostic levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl DiagnosticLevel {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "trace" => Some(DiagnosticLevel::Trace),
            "debug" => Some(DiagnosticLevel::Debug),
            "info" => Some(DiagnosticLevel::Info),
            "warn" => Some(DiagnosticLevel::Warn),
            "error" => Some(DiagnosticLevel::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Trace => write!(f, "TRACE"),
            DiagnosticLevel::Debug => write!(f, "DEBUG"),
            DiagnosticLevel::Info => write!(f, "INFO "),
            DiagnosticLevel::Warn => write!(f, "WARN "),
            DiagnosticLevel::Error => write!(f, "ERROR"),
        }
    }
}

fn parse_enabled(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

struct DiagnosticState {
    path: PathBuf,
    // Opened on first enabled write
    file: Option<File>,
    min_level: DiagnosticLevel,
    enabled: bool,
}

impl DiagnosticState {
    fn new(path: PathBuf, enabled: bool, min_level: DiagnosticLevel) -> Self {
        Self {
            path,
            file: None,
            min_level,
            enabled,
        }
    }

    fn from_env() -> Self {
        let enabled = std::env::var("MODLOG_DEBUG")
            .map(|v| parse_enabled(&v))
            .unwrap_or(false);
        let min_level = std::env::var("MODLOG_LOG_LEVEL")
            .ok()
            .and_then(|v| DiagnosticLevel::parse(&v))
            .unwrap_or(DiagnosticLevel::Debug);

        Self::new(Self::default_log_path(), enabled, min_level)
    }

    fn default_log_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push("modlog-debug.log");
        path
    }

    fn open(&self) -> Option<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .ok()
    }

    fn accepts(&self, level: DiagnosticLevel) -> bool {
        self.enabled && level >= self.min_level
    }

    fn write(&mut self, level: DiagnosticLevel, module: &str, message: &str) {
        if !self.accepts(level) {
            return;
        }

        if self.file.is_none() {
            self.file = self.open();
        }

        if let Some(ref mut file) = self.file {
            let _ = writeln!(file, "{}", format_line(level, module, message));
            let _ = file.flush();
        }
    }

    fn clear(&mut self) {
        if let Ok(file) = File::create(&self.path) {
            drop(file);
        }
        // Force a fresh handle on the next write
        self.file = None;
    }
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs();
            let millis = d.subsec_millis();
            let hours = (secs % 86400) / 3600;
            let mins = (secs % 3600) / 60;
            let secs = secs % 60;
            format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
        })
        .unwrap_or_else(|_| "??:??:??.???".to_string())
}

fn format_line(level: DiagnosticLevel, module: &str, message: &str) -> String {
    format!("[{}] [{}] [{}] {}", timestamp(), level, module, message)
}

static STATE: Lazy<Mutex<DiagnosticState>> = Lazy::new(|| Mutex::new(DiagnosticState::from_env()));

/// Log a message at the specified level
pub fn log(level: DiagnosticLevel, module: &str, message: &str) {
    STATE.lock().write(level, module, message);
}

/// Log a trace message
pub fn trace(module: &str, message: &str) {
    log(DiagnosticLevel::Trace, module, message);
}

/// Log a debug message
pub fn debug(module: &str, message: &str) {
    log(DiagnosticLevel::Debug, module, message);
}

/// Log an info message
pub fn info(module: &str, message: &str) {
    log(DiagnosticLevel::Info, module, message);
}

/// Log a warning message
pub fn warn(module: &str, message: &str) {
    log(DiagnosticLevel::Warn, module, message);
}

/// Log an error message
pub fn error(module: &str, message: &str) {
    log(DiagnosticLevel::Error, module, message);
}

/// Enable or disable diagnostics at runtime, overriding `MODLOG_DEBUG`
pub fn set_enabled(enabled: bool) {
    STATE.lock().enabled = enabled;
}

/// Set the minimum level at runtime, overriding `MODLOG_LOG_LEVEL`
pub fn set_min_level(level: DiagnosticLevel) {
    STATE.lock().min_level = level;
}

/// Whether diagnostics are on; the macros check this before formatting
pub fn is_enabled() -> bool {
    STATE.lock().enabled
}

/// Get the path to the diagnostic log file
pub fn log_file_path() -> PathBuf {
    STATE.lock().path.clone()
}

/// Truncate the diagnostic log file
pub fn clear_log() {
    STATE.lock().clear();
}

/// Convenience macros for diagnostics with automatic module name
///
/// Arguments are only evaluated when diagnostics are enabled.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        if $crate::diagnostics::is_enabled() {
            $crate::diagnostics::trace(module_path!(), &format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::diagnostics::is_enabled() {
            $crate::diagnostics::debug(module_path!(), &format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        if $crate::diagnostics::is_enabled() {
            $crate::diagnostics::info(module_path!(), &format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        if $crate::diagnostics::is_enabled() {
            $crate::diagnostics::warn(module_path!(), &format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        if $crate::diagnostics::is_enabled() {
            $crate::diagnostics::error(module_path!(), &format!($($arg)*))
        }
    };
}
