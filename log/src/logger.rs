use crate::{LogError, LogLevel, Logger, set_logger};
use dirs::data_dir;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Console logger that mirrors every line into a log file.
///
/// When the file already exists it is renamed to a timestamped name and
/// compressed into a `.7z` archive next to it before a fresh file is created.
pub struct AdvancedLogger {
    level: AtomicU8,
    log_file: Option<PathBuf>,
}

impl AdvancedLogger {
    pub fn new(level: LogLevel, log_file: Option<PathBuf>) -> Result<Self, LogError> {
        if let Some(file) = &log_file {
            if file.exists() {
                archive_previous(file);
            }
            if let Some(parent) = file.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::File::create(file)?;
        }

        Ok(AdvancedLogger {
            level: AtomicU8::new(level.rank()),
            log_file,
        })
    }

    /// Installs a logger writing to `<data dir>/<app>/latest.log`.
    ///
    /// Falls back to console-only output when the platform has no data
    /// directory.
    pub fn init(app: &str, log_level: LogLevel) -> Result<(), LogError> {
        let log_file = data_dir().map(|dir| dir.join(app).join("latest.log"));
        let logger = Arc::new(AdvancedLogger::new(log_level, log_file)?);

        set_logger(logger)?;

        Ok(())
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

fn archive_previous(file: &Path) {
    let mut renamed_path = file.to_path_buf();
    renamed_path.set_file_name(format!(
        "{}.log",
        chrono::Local::now().format("%d%m%Y_%H%M%S")
    ));

    if let Err(e) = std::fs::rename(file, &renamed_path) {
        eprintln!("Failed to rename existing log file: {e}");
        return;
    }

    let mut compressed_file = renamed_path.clone();
    compressed_file.set_extension("7z");

    match sevenz_rust2::compress_to_path(&renamed_path, &compressed_file) {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(&renamed_path) {
                eprintln!("Failed to remove old log file: {e}");
            }
        }
        // Keep the plain copy around if it could not be archived.
        Err(e) => eprintln!("Failed to compress file: {e}"),
    }
}

fn log_to_file(log_file: &Path, message: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_file)?;
    writeln!(file, "{message}")?;
    Ok(())
}

impl Logger for AdvancedLogger {
    fn set_level(&self, level: LogLevel) {
        self.level.store(level.rank(), Ordering::Relaxed);
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_rank(self.level.load(Ordering::Relaxed))
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.level().allows(level) {
            return;
        }

        let timestamp = chrono::Local::now().format("%d%m%Y %H:%M:%S");
        println!("{timestamp} - [{level}] - {message}");
        if let Some(ref file) = self.log_file {
            let write_msg = format!("{} - [{}] - {}", timestamp, level.raw_str(), message);
            log_to_file(file, &write_msg).unwrap_or_else(|e| {
                eprintln!("Failed to write to log file: {e}");
            });
        }
    }
}
