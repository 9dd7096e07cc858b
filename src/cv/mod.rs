pub mod contour;
pub mod overlay;

use log::{debug, error, info, warning};
use opencv::core::Point;
use opencv::highgui;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use std::sync::mpsc;

use crate::roi::MouseInput;

pub const MAIN_WINDOW: &str = "Object Measurement";
pub const ROI_WINDOW: &str = "ROI";
pub const EDGES_WINDOW: &str = "Edges";

pub fn get_stream_camera(index: i32, width: i32, height: i32) -> opencv::Result<VideoCapture> {
    info!("Opening camera stream #{} at {}x{}", index, width, height);
    let mut camera = match VideoCapture::new(index, videoio::CAP_ANY) {
        Ok(camera) => camera,
        Err(e) => {
            error!("Failed to open camera: {}", e);
            return Err(e);
        }
    };

    if !camera.is_opened()? {
        error!("Camera #{} could not be opened", index);
        return Err(opencv::Error::new(
            opencv::core::StsError,
            format!("camera #{index} is not available"),
        ));
    }

    // Drivers may silently pick another mode, so only warn.
    if !camera.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)?
        || !camera.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)?
    {
        warning!("Camera refused the requested {}x{} resolution", width, height);
    }
    debug!(
        "Camera opened successfully, delivering {}x{}",
        camera.get(videoio::CAP_PROP_FRAME_WIDTH)?,
        camera.get(videoio::CAP_PROP_FRAME_HEIGHT)?
    );
    Ok(camera)
}

pub fn get_stream_file(file: &str) -> opencv::Result<VideoCapture> {
    info!("Opening input video file stream: {}", file);
    let capture = VideoCapture::from_file(file, videoio::CAP_ANY)?;
    if !capture.is_opened()? {
        error!("Video file {} could not be opened", file);
        return Err(opencv::Error::new(
            opencv::core::StsError,
            format!("cannot open video file {file}"),
        ));
    }
    Ok(capture)
}

/// Creates the main window and routes its mouse events into a channel the
/// frame loop drains.
pub fn init_window() -> opencv::Result<mpsc::Receiver<MouseInput>> {
    debug!("Initializing display window '{}'", MAIN_WINDOW);
    highgui::named_window(MAIN_WINDOW, highgui::WINDOW_AUTOSIZE)?;

    let (tx, rx) = mpsc::channel();
    highgui::set_mouse_callback(
        MAIN_WINDOW,
        Some(Box::new(move |event, x, y, _flags| {
            if let Some(input) = mouse_input(event, x, y) {
                // The receiver only goes away at shutdown.
                let _ = tx.send(input);
            }
        })),
    )?;

    debug!("Window '{}' created successfully", MAIN_WINDOW);
    Ok(rx)
}

pub fn mouse_input(event: i32, x: i32, y: i32) -> Option<MouseInput> {
    let point = Point::new(x, y);
    match event {
        highgui::EVENT_LBUTTONDOWN => Some(MouseInput::Press(point)),
        highgui::EVENT_MOUSEMOVE => Some(MouseInput::Move(point)),
        highgui::EVENT_LBUTTONUP => Some(MouseInput::Release(point)),
        _ => None,
    }
}

/// Closes the ROI debug windows. Missing windows are not an error.
pub fn close_debug_windows() {
    for name in [ROI_WINDOW, EDGES_WINDOW] {
        if let Err(e) = highgui::destroy_window(name) {
            debug!("Window '{}' was not open: {}", name, e);
        }
    }
}
