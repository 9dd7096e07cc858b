use log::{debug, error};
use opencv::core::{
    self, AlgorithmHint, BORDER_CONSTANT, BORDER_DEFAULT, Mat, Point, Size, Vector,
};
use opencv::imgproc;
use opencv::prelude::*;
use std::time::Instant;

use crate::conf::DetectionConf;
use crate::estimate::RotatedRect;

/// Result of running edge/contour detection on an ROI image.
pub struct OutlineDetection {
    /// Dilated edge map, shown in the debug window
    pub edges: Mat,
    /// Fitted rectangle around the largest contour, ROI-relative. Kept as the
    /// OpenCV type so the overlay can draw it with `box_points`.
    pub outline: Option<core::RotatedRect>,
    pub contour_area: f64,
}

impl From<core::RotatedRect> for RotatedRect {
    fn from(rect: core::RotatedRect) -> Self {
        RotatedRect::new(
            (rect.center.x as f64, rect.center.y as f64),
            (rect.size.width as f64, rect.size.height as f64),
            rect.angle as f64,
        )
    }
}

/// Grayscale, blur, Canny, dilate, then fits a minimum-area rectangle around
/// the largest external contour.
pub fn detect_outline(roi: &Mat, params: &DetectionConf) -> opencv::Result<OutlineDetection> {
    let start_time = Instant::now();

    let mut gray = Mat::default();
    if let Err(e) = imgproc::cvt_color(
        roi,
        &mut gray,
        imgproc::COLOR_BGR2GRAY,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    ) {
        error!("Failed to convert ROI to grayscale: {}", e);
        return Err(e);
    }

    let mut blurred = Mat::default();
    let kernel_side = odd_kernel(params.blur_kernel);
    imgproc::gaussian_blur(
        &gray,
        &mut blurred,
        Size::new(kernel_side, kernel_side),
        0.,
        0.,
        BORDER_DEFAULT,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut canny = Mat::default();
    imgproc::canny(&blurred, &mut canny, params.canny_low, params.canny_high, 3, false)?;

    let kernel = Mat::ones(3, 3, core::CV_8U)?.to_mat()?;
    let mut edges = Mat::default();
    imgproc::dilate(
        &canny,
        &mut edges,
        &kernel,
        Point::new(-1, -1),
        params.dilate_iterations.max(0),
        BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;

    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours(
        &edges,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    let mut largest: Option<(f64, Vector<Point>)> = None;
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        if largest.as_ref().is_none_or(|(best, _)| area > *best) {
            largest = Some((area, contour));
        }
    }

    let (outline, contour_area) = match largest {
        Some((area, contour)) if area > params.min_contour_area => {
            (Some(imgproc::min_area_rect(&contour)?), area)
        }
        Some((area, _)) => {
            debug!(
                "Largest contour too small ({:.0} <= {:.0} px²)",
                area, params.min_contour_area
            );
            (None, area)
        }
        None => (None, 0.0),
    };

    debug!(
        "Outline detection over {} contours finished in {:?}",
        contours.len(),
        start_time.elapsed()
    );

    Ok(OutlineDetection {
        edges,
        outline,
        contour_area,
    })
}

fn odd_kernel(side: i32) -> i32 {
    let side = side.max(1);
    if side % 2 == 0 { side + 1 } else { side }
}
