//! # Logging Library
//!
//! Process-wide logger shared by every crate in the workspace. A single
//! [`Logger`] is installed once with [`set_logger`] and reached through the
//! `debug!`, `info!`, `warning!`, `error!` and `critical!` macros.
use colored::Colorize;
use std::fmt::Display;
use std::sync::{Arc, OnceLock};

/// Submodule containing advanced logger implementations
pub mod logger;

/// The installed logger; written exactly once.
static LOGGER: OnceLock<Arc<dyn Logger + Send + Sync>> = OnceLock::new();

/// Sets the global logger instance for the application
///
/// # Arguments
///
/// * `logger` - A thread-safe reference to a logger implementation
///
/// # Returns
///
/// * `Ok(())` if the logger was successfully set
/// * `Err(LogError::AlreadyInitialized)` if a logger has already been initialized
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use log::logger::AdvancedLogger;
/// use log::{set_logger, LogLevel};
///
/// let logger = Arc::new(AdvancedLogger::new(LogLevel::Debug, None).unwrap());
/// set_logger(logger).expect("Failed to initialize logger");
/// ```
pub fn set_logger(logger: Arc<dyn Logger + Send + Sync>) -> Result<(), LogError> {
    LOGGER.set(logger).map_err(|_| LogError::AlreadyInitialized)
}

/// Retrieves a reference to the current global logger, if one is set
pub fn logger() -> Option<Arc<dyn Logger + Send + Sync>> {
    LOGGER.get().cloned()
}

/// Errors that can occur during logger operations
#[derive(Debug)]
pub enum LogError {
    /// Returned when attempting to initialize a logger after one has already been set
    AlreadyInitialized,
    /// Returned when attempting to use a logger before one has been set
    NoLogger,
    /// The log file could not be prepared
    Io(std::io::Error),
}

impl Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::AlreadyInitialized => write!(f, "Logger has already been initialized"),
            LogError::NoLogger => write!(f, "No logger set"),
            LogError::Io(e) => write!(f, "Log file error: {e}"),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        LogError::Io(e)
    }
}

/// Trait that all logger implementations must implement
pub trait Logger: Send + Sync {
    /// Logs a message at INFO level
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
    /// Logs a message at WARNING level
    fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }
    /// Logs a message at ERROR level
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
    /// Logs a message at CRITICAL level
    fn critical(&self, message: &str) {
        self.log(LogLevel::Critical, message);
    }
    /// Logs a message at DEBUG level
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
    /// Logs a message with a specified log level
    fn log(&self, level: LogLevel, message: &str);
    /// Sets the minimum logging level that will be output
    fn set_level(&self, level: LogLevel);
    /// Current minimum level
    fn level(&self) -> LogLevel;
}

/// Defines the possible logging levels.
///
/// The default level is Info. `NoLog` suppresses everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Special level that suppresses all logging
    NoLog,
    /// Debug information for development purposes
    Debug,
    #[default]
    /// Standard informational messages
    Info,
    /// Warning messages indicating potential issues
    Warning,
    /// Error messages for recoverable failures
    Error,
    /// Critical messages for severe errors that might cause program termination
    Critical,
}

impl LogLevel {
    /// Returns the string representation of the log level
    pub fn raw_str(&self) -> &'static str {
        match self {
            LogLevel::NoLog => "NOLOG",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    fn rank(self) -> u8 {
        match self {
            LogLevel::NoLog => 0,
            LogLevel::Debug => 1,
            LogLevel::Info => 2,
            LogLevel::Warning => 3,
            LogLevel::Error => 4,
            LogLevel::Critical => 5,
        }
    }

    pub(crate) fn from_rank(rank: u8) -> Self {
        match rank {
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warning,
            4 => LogLevel::Error,
            5 => LogLevel::Critical,
            _ => LogLevel::NoLog,
        }
    }

    /// Whether a logger configured with `self` lets a `message` level through
    pub fn allows(self, message: LogLevel) -> bool {
        self != LogLevel::NoLog && message != LogLevel::NoLog && message.rank() >= self.rank()
    }
}

impl Display for LogLevel {
    /// Provides colored text formatting for each log level
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LogLevel::*;
        let level_str = match self {
            NoLog => String::new(),
            Info => format!("{}", "INFO".blue().bold()),
            Warning => format!("{}", "WARNING".yellow().bold()),
            Error => format!("{}", "ERROR".red().bold()),
            Critical => format!("{}", "CRITICAL".bright_red().bold()),
            Debug => format!("{}", "DEBUG".cyan().bold()),
        };
        write!(f, "{level_str}")
    }
}

/// Logs a message with the specified log level
///
/// # Example
///
/// ```
/// use log::{log, LogLevel};
///
/// log!(LogLevel::Warning, "This is a {} message", "warning");
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {{
        if let Some(logger) = $crate::logger() {
            let message = format!($($arg)*);
            logger.log($level, &message);
        }
    }};
}

/// Logs a message at INFO level
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        $crate::log!($crate::LogLevel::Info, $($arg)*);
    }};
}

/// Logs a message at WARNING level
#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {{
        $crate::log!($crate::LogLevel::Warning, $($arg)*);
    }};
}

/// Logs a message at ERROR level
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        $crate::log!($crate::LogLevel::Error, $($arg)*);
    }};
}

/// Logs a message at CRITICAL level
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {{
        $crate::log!($crate::LogLevel::Critical, $($arg)*);
    }};
}

/// Logs a message at DEBUG level
///
/// # Example
///
/// ```
/// use log::debug;
///
/// debug!("Processing ROI {:?} at {} cm", (10, 10, 120, 80), 50);
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        $crate::log!($crate::LogLevel::Debug, $($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::AdvancedLogger;

    fn install(level: LogLevel) {
        match logger() {
            Some(logger) => logger.set_level(level),
            None => {
                let logger = Arc::new(AdvancedLogger::new(level, None).unwrap());
                // Another test may win the race; adjust whichever logger is live.
                if set_logger(logger).is_err() {
                    logger_or_panic().set_level(level);
                }
            }
        }
    }

    fn logger_or_panic() -> Arc<dyn Logger + Send + Sync> {
        logger().unwrap()
    }

    #[test]
    fn test_advance_logger() {
        install(LogLevel::Debug);

        debug!("This is a debug message");
        info!("This is an info message");
        warning!("This is a warning message");
        error!("This is an error message");
        critical!("This is a critical message");
    }

    #[test]
    fn test_log_levels() {
        assert!(LogLevel::Warning.allows(LogLevel::Error));
        assert!(LogLevel::Warning.allows(LogLevel::Warning));
        assert!(!LogLevel::Warning.allows(LogLevel::Info));
        assert!(!LogLevel::Warning.allows(LogLevel::Debug));
        assert!(LogLevel::Debug.allows(LogLevel::Critical));
        assert!(!LogLevel::NoLog.allows(LogLevel::Critical));
    }

    #[test]
    fn test_level_rank_round_trip() {
        for level in [
            LogLevel::NoLog,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ] {
            assert_eq!(LogLevel::from_rank(level.rank()), level);
        }
    }

    #[test]
    #[should_panic(expected = "AlreadyInitialized")]
    fn test_logger_init_once() {
        let logger1 = Arc::new(AdvancedLogger::new(LogLevel::Debug, None).unwrap());
        let _ = set_logger(logger1);

        let logger2 = Arc::new(AdvancedLogger::new(LogLevel::Info, None).unwrap());
        set_logger(logger2).unwrap(); // This should panic
    }
}
