use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::Args;
use crate::estimate::CameraCalibration;
use crate::{catalog, roi};

pub const APP_NAME: &str = "sizecam";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConf {
	pub index: i32,
	pub frame_width: i32,
	pub frame_height: i32,
	pub focal_length_mm: f64,
	pub sensor_width_mm: f64,
}

impl Default for CameraConf {
	fn default() -> Self {
		Self { index: 0, frame_width: 640, frame_height: 480, focal_length_mm: 3.6, sensor_width_mm: 4.8 }
	}
}

impl CameraConf {
	pub fn calibration(&self) -> CameraCalibration {
		CameraCalibration::new(self.focal_length_mm, self.sensor_width_mm, self.frame_width as f64)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConf {
	pub initial_cm: f64,
	pub step_cm: f64,
	pub min_cm: f64,
}

impl Default for DistanceConf {
	fn default() -> Self {
		Self { initial_cm: 50.0, step_cm: 5.0, min_cm: 5.0 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConf {
	/// Gaussian kernel side, must be odd
	pub blur_kernel: i32,
	pub canny_low: f64,
	pub canny_high: f64,
	pub dilate_iterations: i32,
	/// Contours with a smaller area (px²) are ignored
	pub min_contour_area: f64,
	pub min_roi_px: i32,
}

impl Default for DetectionConf {
	fn default() -> Self {
		Self {
			blur_kernel: 5,
			canny_low: 50.0,
			canny_high: 150.0,
			dilate_iterations: 1,
			min_contour_area: 100.0,
			min_roi_px: roi::MIN_ROI_PX,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
	pub version: u8,
	pub db_conn: String,
	pub camera: CameraConf,
	pub distance: DistanceConf,
	pub detection: DetectionConf,
	pub match_tolerance_cm: f64,
	pub smoothing_window: usize,
}

impl ::std::default::Default for Conf {
	fn default() -> Self {
		Self {
			version: 0,
			db_conn: "sqlite://sizecam.db?mode=rwc".into(),
			camera: CameraConf::default(),
			distance: DistanceConf::default(),
			detection: DetectionConf::default(),
			match_tolerance_cm: catalog::DEFAULT_TOLERANCE_CM,
			smoothing_window: 10,
		}
	}
}

impl Conf {
	/// Command line values win over the stored configuration.
	pub fn with_overrides(mut self, args: &Args) -> Self {
		if let Some(distance) = args.distance {
			self.distance.initial_cm = distance;
		}
		if let Some(db) = &args.db {
			self.db_conn = db.clone();
		}
		if let Some(tolerance) = args.tolerance {
			self.match_tolerance_cm = tolerance;
		}
		self
	}
}

pub fn load_config(path: Option<&Path>) -> Result<Conf> {
	let cfg: Conf = match path {
		Some(path) => confy::load_path(path)
			.with_context(|| format!("Failed to load config from {}", path.display()))?,
		None => confy::load(APP_NAME, None).context("Failed to load config")?,
	};
	debug!("Loaded configuration: {:?}", cfg);
	Ok(cfg)
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;
	use tempfile::tempdir;

	#[test]
	fn defaults_give_480px_focal_length() {
		let cfg = Conf::default();
		assert!((cfg.camera.calibration().focal_length_px() - 480.0).abs() < 1e-9);
	}

	#[test]
	fn missing_file_is_created_with_defaults() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("sizecam.yml");

		let cfg = load_config(Some(&path)).unwrap();

		assert_eq!(cfg, Conf::default());
		assert!(path.exists());
	}

	#[test]
	fn partial_file_falls_back_to_defaults() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("sizecam.yml");
		std::fs::write(&path, "match_tolerance_cm: 2.5\ndistance:\n  initial_cm: 30.0\n").unwrap();

		let cfg = load_config(Some(&path)).unwrap();

		assert_eq!(cfg.match_tolerance_cm, 2.5);
		assert_eq!(cfg.distance.initial_cm, 30.0);
		assert_eq!(cfg.distance.step_cm, 5.0);
		assert_eq!(cfg.detection, DetectionConf::default());
	}

	#[test]
	fn cli_overrides_win() {
		let args = Args::parse_from(["sizecam", "--distance", "80", "--db", "sqlite::memory:", "--tolerance", "0.5"]);
		let cfg = Conf::default().with_overrides(&args);

		assert_eq!(cfg.distance.initial_cm, 80.0);
		assert_eq!(cfg.db_conn, "sqlite::memory:");
		assert_eq!(cfg.match_tolerance_cm, 0.5);
	}
}
