use anyhow::{Context, Result};
use cli::parse_args;
use conf::{APP_NAME, load_config};
use log::logger::AdvancedLogger;
use log::{LogError, LogLevel, info, set_logger};
use std::sync::Arc;

use catalog::ReferenceCatalog;
use export::MeasurementLog;
use session::{FrameProcessor, FrameState, Session};

mod catalog;
mod cli;
mod conf;
mod controls;
mod cv;
mod estimate;
mod export;
mod roi;
mod session;
mod stats;

/// Console-only logger for when the log file cannot be created.
fn install_console_logger(level: LogLevel) -> Result<(), LogError> {
	let console = AdvancedLogger::new(level, None)?;
	set_logger(Arc::new(console))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let args = parse_args();

	let level = if args.debug { LogLevel::Debug } else { LogLevel::Info };
	if let Err(e) = AdvancedLogger::init(APP_NAME, level) {
		eprintln!("Logging to file disabled: {e}");
		if let Err(e) = install_console_logger(level) {
			eprintln!("Console logging unavailable: {e}");
		}
	}

	let cfg = load_config(args.config.as_deref())?.with_overrides(&args);

	let capture = match &args.video {
		Some(file) => cv::get_stream_file(file),
		None => cv::get_stream_camera(cfg.camera.index, cfg.camera.frame_width, cfg.camera.frame_height),
	}
	.context("Failed to open video source")?;

	let catalog = if args.verify {
		Some(ReferenceCatalog::open(&cfg.db_conn).await?)
	} else {
		None
	};
	let export = args.export.as_deref().map(MeasurementLog::create).transpose()?;

	let mouse = cv::init_window().context("Failed to create display window")?;
	let processor = FrameProcessor::new(&cfg, catalog, export);
	let session = Session::new(capture, mouse, processor, cfg.detection.min_roi_px);

	session.run(FrameState::from_conf(&cfg)).await?;
	info!("Session finished");
	Ok(())
}
