use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Measure objects in a webcam stream", long_about = None)]
pub struct Args {
	/// Read a file instead of using the camera
	#[arg(short, long)]
	pub video: Option<String>,

	/// Export every measurement to a CSV file
	#[arg(short, long)]
	pub export: Option<PathBuf>,

	/// Output debug information
	#[arg(short, long)]
	pub debug: bool,

	/// Check measurements against the reference catalog
	#[arg(long)]
	pub verify: bool,

	/// Initial distance to the object in centimeters
	#[arg(long)]
	pub distance: Option<f64>,

	/// Database URL of the reference catalog
	#[arg(long)]
	pub db: Option<String>,

	/// Matching tolerance in centimeters
	#[arg(long)]
	pub tolerance: Option<f64>,

	/// Configuration file to use instead of the default location
	#[arg(short, long)]
	pub config: Option<PathBuf>,
}

pub fn parse_args() -> Args {
	Args::parse()
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn command_is_well_formed() {
		Args::command().debug_assert();
	}

	#[test]
	fn defaults_to_camera_without_verification() {
		let args = Args::parse_from(["sizecam"]);
		assert!(args.video.is_none());
		assert!(!args.verify);
		assert!(!args.debug);
	}

	#[test]
	fn parses_short_flags() {
		let args = Args::parse_from(["sizecam", "-v", "clip.mp4", "-e", "out.csv", "-d", "--verify"]);
		assert_eq!(args.video.as_deref(), Some("clip.mp4"));
		assert_eq!(args.export, Some(PathBuf::from("out.csv")));
		assert!(args.debug);
		assert!(args.verify);
	}
}
