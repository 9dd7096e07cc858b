use anyhow::{Context, Result};
use csv::Writer;
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::catalog::Verdict;
use crate::estimate::PhysicalSize;

const FLUSH_INTERVAL: u64 = 50;

/// One CSV row. `width_cm`/`height_cm` are the estimate of this frame alone;
/// the verdict was taken on the rolling mean stored next to it.
#[derive(Debug, Serialize)]
struct MeasurementRecord {
    frame: u64,
    distance_cm: f64,
    width_cm: f64,
    height_cm: f64,
    mean_width_cm: f64,
    mean_height_cm: f64,
    verdict: Option<String>,
}

/// CSV log of every estimate produced during a session.
pub struct MeasurementLog {
    writer: Writer<File>,
    written: u64,
}

impl MeasurementLog {
    pub fn create(path: &Path) -> Result<Self> {
        info!("Exporting measurements to {}", path.display());
        let writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self { writer, written: 0 })
    }

    pub fn record(
        &mut self,
        frame: u64,
        distance_cm: f64,
        raw: PhysicalSize,
        mean: PhysicalSize,
        verdict: Option<Verdict>,
    ) -> Result<()> {
        self.writer.serialize(MeasurementRecord {
            frame,
            distance_cm,
            width_cm: raw.width_cm,
            height_cm: raw.height_cm,
            mean_width_cm: mean.width_cm,
            mean_height_cm: mean.height_cm,
            verdict: verdict.map(|v| v.to_string()),
        })?;
        self.written += 1;

        if self.written % FLUSH_INTERVAL == 0 {
            debug!("Flushing {} exported measurements", self.written);
            self.writer.flush()?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        info!("Exported {} measurements", self.written);
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("measurements.csv");

        let mut log = MeasurementLog::create(&path).unwrap();
        log.record(
            3,
            50.0,
            PhysicalSize::new(25.0, 15.0),
            PhysicalSize::new(20.5, 10.25),
            Some(Verdict::Correct),
        )
        .unwrap();
        let size = PhysicalSize::new(21.0, 11.0);
        log.record(4, 55.0, size, size, None).unwrap();
        assert_eq!(log.finish().unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "frame,distance_cm,width_cm,height_cm,mean_width_cm,mean_height_cm,verdict"
        );
        assert_eq!(lines[1], "3,50.0,25.0,15.0,20.5,10.25,correct");
        assert_eq!(lines[2], "4,55.0,21.0,11.0,21.0,11.0,");
    }

    #[test]
    fn create_fails_for_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(MeasurementLog::create(&path).is_err());
    }
}
