use anyhow::{Context, Result};
use log::{debug, info, warning};
use opencv::core::{Mat, Rect};
use opencv::highgui;
use opencv::prelude::*;
use opencv::videoio::VideoCapture;
use std::sync::mpsc;

use crate::catalog::{ReferenceCatalog, Verification};
use crate::conf::{Conf, DetectionConf};
use crate::controls::{Command, Distance};
use crate::cv::{self, contour, overlay};
use crate::estimate::{CameraCalibration, PhysicalSize, RotatedRect, estimate};
use crate::export::MeasurementLog;
use crate::roi::{MouseInput, RoiState, clamp_to_frame};
use crate::stats::MeasurementStats;

/// Everything that changes from one frame to the next.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub roi: RoiState,
    pub distance: Distance,
    pub stats: MeasurementStats,
    pub frame_index: u64,
}

impl FrameState {
    pub fn from_conf(conf: &Conf) -> Self {
        Self {
            roi: RoiState::Idle,
            distance: Distance::new(
                conf.distance.initial_cm,
                conf.distance.step_cm,
                conf.distance.min_cm,
            ),
            stats: MeasurementStats::new(conf.smoothing_window),
            frame_index: 0,
        }
    }

    pub fn with_mouse(self, inputs: impl IntoIterator<Item = MouseInput>, min_px: i32) -> Self {
        let roi = inputs
            .into_iter()
            .fold(self.roi, |roi, input| roi.on_mouse(input, min_px));
        Self { roi, ..self }
    }

    /// Applies a key command. Returns `None` when the session should end.
    pub fn apply(mut self, command: Command) -> Option<Self> {
        match command {
            Command::Quit => return None,
            Command::Farther => self.distance = self.distance.increased(),
            Command::Closer => self.distance = self.distance.decreased(),
            Command::ResetRoi => {
                self.roi = self.roi.reset();
                self.stats.reset();
            }
        }
        Some(self)
    }
}

#[derive(Debug, Clone)]
pub struct Measurement {
    /// Estimate from this frame alone
    pub raw: PhysicalSize,
    /// Rolling mean shown to the user
    pub smoothed: PhysicalSize,
    pub verification: Option<Verification>,
}

/// Side products of one processed frame.
#[derive(Default)]
pub struct FrameOutput {
    /// Cropped ROI and its edge map, for the debug windows
    pub roi_view: Option<(Mat, Mat)>,
    pub measurement: Option<Measurement>,
}

/// Detection, estimation and verification for a single frame.
pub struct FrameProcessor {
    calibration: CameraCalibration,
    /// Width of the last frame seen and the focal length derived from it
    focal: Option<(i32, f64)>,
    detection: DetectionConf,
    tolerance_cm: f64,
    catalog: Option<ReferenceCatalog>,
    export: Option<MeasurementLog>,
}

impl FrameProcessor {
    pub fn new(
        conf: &Conf,
        catalog: Option<ReferenceCatalog>,
        export: Option<MeasurementLog>,
    ) -> Self {
        Self {
            calibration: conf.camera.calibration(),
            focal: None,
            detection: conf.detection.clone(),
            tolerance_cm: conf.match_tolerance_cm,
            catalog,
            export,
        }
    }

    /// Focal length for frames `width` px wide. Drivers may ignore the
    /// requested resolution and files carry their own, so it follows the
    /// frames actually delivered.
    fn focal_px(&mut self, width: i32) -> f64 {
        match self.focal {
            Some((seen, focal_px)) if seen == width => focal_px,
            _ => {
                let focal_px = self
                    .calibration
                    .for_frame_width(width as f64)
                    .focal_length_px();
                if width as f64 != self.calibration.frame_width_px {
                    warning!(
                        "Frames are {} px wide instead of the configured {}",
                        width,
                        self.calibration.frame_width_px
                    );
                }
                info!("Using focal length of {:.1} px", focal_px);
                self.focal = Some((width, focal_px));
                focal_px
            }
        }
    }

    /// Runs the pipeline on `frame`, drawing the overlay into it, and hands
    /// back the updated state.
    pub fn process_frame(
        &mut self,
        frame: &mut Mat,
        mut state: FrameState,
    ) -> Result<(FrameState, FrameOutput)> {
        state.frame_index += 1;
        let mut output = FrameOutput::default();

        if !state.roi.is_tracking() {
            overlay::draw_prompt(frame)?;
        }
        if let Some((origin, current)) = state.roi.selection() {
            overlay::draw_selection(frame, origin, current)?;
        }

        if let Some(tracked) = state.roi.tracked() {
            let frame_size = frame.size()?;
            match clamp_to_frame(tracked, frame_size.width, frame_size.height) {
                Some(roi) => {
                    let (view, measurement) = self.measure(frame, roi, &mut state)?;
                    output.roi_view = Some(view);
                    output.measurement = measurement;
                }
                None => {
                    warning!("ROI {:?} lies outside the {:?} frame, resetting", tracked, frame_size);
                    state.roi = state.roi.reset();
                }
            }
        }

        overlay::draw_distance(frame, state.distance.cm())?;
        Ok((state, output))
    }

    fn measure(
        &mut self,
        frame: &mut Mat,
        roi: Rect,
        state: &mut FrameState,
    ) -> Result<((Mat, Mat), Option<Measurement>)> {
        let roi_frame = Mat::roi(&*frame, roi)?.try_clone()?;
        let detection = contour::detect_outline(&roi_frame, &self.detection)?;

        let Some(fitted) = detection.outline else {
            return Ok(((roi_frame, detection.edges), None));
        };

        let focal_px = self.focal_px(frame.cols());
        let raw = match estimate(&RotatedRect::from(fitted), state.distance.cm(), focal_px) {
            Ok(size) => size,
            Err(e) => {
                debug!("Skipping measurement on frame {}: {}", state.frame_index, e);
                return Ok(((roi_frame, detection.edges), None));
            }
        };
        state.stats.update(raw);
        let smoothed = state.stats.mean().unwrap_or(raw);

        overlay::draw_outline(frame, &fitted, roi.tl())?;
        overlay::draw_measurement(frame, smoothed)?;

        let verification = match &self.catalog {
            Some(catalog) => {
                let verification = catalog.verify(smoothed, self.tolerance_cm);
                overlay::draw_verdict(frame, verification.verdict)?;
                if let Some(name) = &verification.matched {
                    debug!("Object matches catalog entry '{}'", name);
                }
                Some(verification)
            }
            None => None,
        };

        if let Some(export) = &mut self.export {
            export.record(
                state.frame_index,
                state.distance.cm(),
                raw,
                smoothed,
                verification.as_ref().map(|v| v.verdict),
            )?;
        }

        Ok((
            (roi_frame, detection.edges),
            Some(Measurement {
                raw,
                smoothed,
                verification,
            }),
        ))
    }

    /// Closes the catalog connection and flushes the export file.
    pub async fn shutdown(self) -> Result<()> {
        if let Some(export) = self.export {
            export.finish()?;
        }
        if let Some(catalog) = self.catalog {
            catalog.close().await?;
        }
        Ok(())
    }
}

/// The interactive capture loop.
pub struct Session {
    capture: VideoCapture,
    mouse: mpsc::Receiver<MouseInput>,
    processor: FrameProcessor,
    min_roi_px: i32,
}

impl Session {
    pub fn new(
        capture: VideoCapture,
        mouse: mpsc::Receiver<MouseInput>,
        processor: FrameProcessor,
        min_roi_px: i32,
    ) -> Self {
        Self {
            capture,
            mouse,
            processor,
            min_roi_px,
        }
    }

    pub async fn run(mut self, mut state: FrameState) -> Result<()> {
        info!("Starting measurement loop, distance {:.0} cm", state.distance.cm());
        let mut frame = Mat::default();

        loop {
            if !self.capture.read(&mut frame).context("Failed to read frame")? || frame.empty() {
                info!("No more frames after {}, stopping", state.frame_index);
                break;
            }

            let was_tracking = state.roi.is_tracking();
            state = state.with_mouse(self.mouse.try_iter(), self.min_roi_px);
            if was_tracking && !state.roi.is_tracking() {
                cv::close_debug_windows();
            }

            let (next, output) = self.processor.process_frame(&mut frame, state)?;
            state = next;

            if let Some((roi, edges)) = &output.roi_view {
                highgui::imshow(cv::ROI_WINDOW, roi)?;
                highgui::imshow(cv::EDGES_WINDOW, edges)?;
            }
            highgui::imshow(cv::MAIN_WINDOW, &frame)?;

            let Some(command) = Command::from_key(highgui::wait_key(1)?) else {
                continue;
            };
            debug!("Key command {:?}", command);
            if command == Command::ResetRoi {
                cv::close_debug_windows();
            }
            match state.apply(command) {
                Some(next) => {
                    if matches!(command, Command::Closer | Command::Farther) {
                        info!("Distance set to {:.0} cm", next.distance.cm());
                    }
                    state = next;
                }
                None => {
                    info!("Quit requested");
                    break;
                }
            }
        }

        self.processor.shutdown().await?;
        self.capture.release()?;
        highgui::destroy_all_windows()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Verdict, match_dimensions};
    use opencv::core::{CV_8UC3, Point, Scalar};
    use opencv::imgproc;
    use serde::Deserialize;
    use tempfile::tempdir;

    fn sized_frame_with_box(cols: i32, rows: i32, bbox: Rect) -> Mat {
        let mut frame =
            Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.)).unwrap();
        imgproc::rectangle(&mut frame, bbox, Scalar::all(255.), -1, imgproc::LINE_8, 0).unwrap();
        frame
    }

    fn frame_with_box(width: i32, height: i32) -> Mat {
        sized_frame_with_box(640, 480, Rect::new(150, 120, width, height))
    }

    fn dragged(conf: &Conf, from: Point, to: Point) -> FrameState {
        FrameState::from_conf(conf).with_mouse(
            [MouseInput::Press(from), MouseInput::Release(to)],
            conf.detection.min_roi_px,
        )
    }

    fn tracking_state(conf: &Conf) -> FrameState {
        dragged(conf, Point::new(100, 80), Point::new(500, 400))
    }

    #[test]
    fn quit_ends_and_reset_clears() {
        let conf = Conf::default();
        let mut state = tracking_state(&conf);
        state.stats.update(PhysicalSize::new(1.0, 1.0));

        let reset = state.clone().apply(Command::ResetRoi).unwrap();
        assert_eq!(reset.roi, RoiState::Idle);
        assert_eq!(reset.stats.count(), 0);
        assert!(state.apply(Command::Quit).is_none());
    }

    #[test]
    fn distance_commands_respect_floor() {
        let conf = Conf::default();
        let mut state = FrameState::from_conf(&conf);
        for _ in 0..20 {
            state = state.apply(Command::Closer).unwrap();
        }
        assert_eq!(state.distance.cm(), 5.0);
        state = state.apply(Command::Farther).unwrap();
        assert_eq!(state.distance.cm(), 10.0);
    }

    #[test]
    fn idle_frames_produce_no_measurement() {
        let conf = Conf::default();
        let mut processor = FrameProcessor::new(&conf, None, None);
        let mut frame = frame_with_box(200, 100);

        let (state, output) = processor
            .process_frame(&mut frame, FrameState::from_conf(&conf))
            .unwrap();

        assert_eq!(state.frame_index, 1);
        assert!(output.measurement.is_none());
        assert!(output.roi_view.is_none());
    }

    #[test]
    fn tracked_box_is_measured() {
        let conf = Conf::default();
        let mut processor = FrameProcessor::new(&conf, None, None);
        let mut frame = frame_with_box(200, 100);

        let (state, output) = processor
            .process_frame(&mut frame, tracking_state(&conf))
            .unwrap();

        let measurement = output.measurement.expect("measurement");
        // 200x100 px at 50 cm with a 480 px focal length, plus edge growth.
        assert!((measurement.raw.width_cm - 20.83).abs() < 1.0);
        assert!((measurement.raw.height_cm - 10.42).abs() < 1.0);
        assert!(measurement.verification.is_none());
        assert_eq!(state.stats.count(), 1);

        let (roi, edges) = output.roi_view.expect("debug views");
        assert_eq!(roi.size().unwrap(), opencv::core::Size::new(400, 320));
        assert_eq!(edges.size().unwrap(), roi.size().unwrap());
    }

    #[test]
    fn focal_length_follows_delivered_frame_width() {
        // Configured for 640 px, but the source delivers 1280x960.
        let conf = Conf::default();
        let mut processor = FrameProcessor::new(&conf, None, None);
        let mut frame = sized_frame_with_box(1280, 960, Rect::new(300, 240, 400, 200));
        let state = dragged(&conf, Point::new(200, 160), Point::new(1000, 800));

        let (_, output) = processor.process_frame(&mut frame, state).unwrap();

        // 400x200 px at 50 cm with a 960 px focal length.
        let measurement = output.measurement.expect("measurement");
        assert!((measurement.raw.width_cm - 20.83).abs() < 1.0);
        assert!((measurement.raw.height_cm - 10.42).abs() < 1.0);
        let (width, focal_px) = processor.focal.unwrap();
        assert_eq!(width, 1280);
        assert!((focal_px - 960.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn catalog_verdict_is_attached() {
        let conf = Conf::default();
        let catalog = ReferenceCatalog::open("sqlite::memory:").await.unwrap();
        let mut processor = FrameProcessor::new(&conf, Some(catalog), None);
        // 21x15 cm at 50 cm distance is roughly 202x144 px.
        let mut frame = frame_with_box(200, 142);

        let (_, output) = processor
            .process_frame(&mut frame, tracking_state(&conf))
            .unwrap();

        let verification = output.measurement.unwrap().verification.unwrap();
        assert_eq!(verification.verdict, Verdict::Correct);
        assert_eq!(verification.matched.as_deref(), Some("Книга"));
        processor.shutdown().await.unwrap();
    }

    #[derive(Debug, Deserialize)]
    struct ExportedRow {
        width_cm: f64,
        mean_width_cm: f64,
        mean_height_cm: f64,
        verdict: String,
    }

    #[tokio::test]
    async fn exported_verdict_matches_the_mean_in_its_row() {
        let conf = Conf::default();
        let dir = tempdir().unwrap();
        let path = dir.path().join("measurements.csv");
        let catalog = ReferenceCatalog::open("sqlite::memory:").await.unwrap();
        let entries = catalog.entries().to_vec();
        let export = MeasurementLog::create(&path).unwrap();
        let mut processor = FrameProcessor::new(&conf, Some(catalog), Some(export));

        // Nine book-sized frames, then one frame roughly 27 cm wide.
        let mut state = tracking_state(&conf);
        for width in [200, 200, 200, 200, 200, 200, 200, 200, 200, 260] {
            let mut frame = frame_with_box(width, 142);
            let (next, _) = processor.process_frame(&mut frame, state).unwrap();
            state = next;
        }
        processor.shutdown().await.unwrap();

        let rows: Vec<ExportedRow> = csv::Reader::from_path(&path)
            .unwrap()
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 10);
        for row in &rows {
            let expected = match_dimensions(
                &entries,
                row.mean_width_cm,
                row.mean_height_cm,
                conf.match_tolerance_cm,
            );
            assert_eq!(row.verdict, expected.verdict.to_string());
        }

        let last = rows.last().unwrap();
        assert!(last.width_cm > 25.0);
        assert!(last.mean_width_cm < 22.0);
        assert_eq!(last.verdict, "correct");
    }

    #[test]
    fn roi_outside_frame_resets_to_idle() {
        let conf = Conf::default();
        let mut processor = FrameProcessor::new(&conf, None, None);
        let mut frame = frame_with_box(200, 100);
        let state = FrameState {
            roi: RoiState::Tracking(Rect::new(700, 500, 50, 50)),
            ..FrameState::from_conf(&conf)
        };

        let (state, output) = processor.process_frame(&mut frame, state).unwrap();

        assert_eq!(state.roi, RoiState::Idle);
        assert!(output.measurement.is_none());
    }
}
