use opencv::core::{self, Mat, Point, Scalar, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use crate::catalog::Verdict;
use crate::estimate::PhysicalSize;

fn red() -> Scalar {
    Scalar::new(0., 0., 255., 0.)
}

fn green() -> Scalar {
    Scalar::new(0., 255., 0., 0.)
}

fn white() -> Scalar {
    Scalar::new(255., 255., 255., 0.)
}

fn text(frame: &mut Mat, content: &str, origin: Point, scale: f64, color: Scalar, thickness: i32) -> opencv::Result<()> {
    imgproc::put_text(
        frame,
        content,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        thickness,
        imgproc::LINE_8,
        false,
    )
}

pub fn draw_prompt(frame: &mut Mat) -> opencv::Result<()> {
    text(frame, "Select an object", Point::new(10, 30), 0.7, red(), 2)
}

/// Drag box between the press point and the cursor, in any direction.
pub fn draw_selection(frame: &mut Mat, origin: Point, current: Point) -> opencv::Result<()> {
    imgproc::rectangle_points(frame, origin, current, green(), 2, imgproc::LINE_8, 0)
}

/// Draws the fitted rectangle, shifted from ROI to frame coordinates.
pub fn draw_outline(frame: &mut Mat, outline: &core::RotatedRect, offset: Point) -> opencv::Result<()> {
    let mut points = Mat::default();
    imgproc::box_points(*outline, &mut points)?;

    let mut corners = Vector::<Point>::new();
    for row in 0..points.rows() {
        let x = *points.at_2d::<f32>(row, 0)?;
        let y = *points.at_2d::<f32>(row, 1)?;
        corners.push(Point::new(x.round() as i32 + offset.x, y.round() as i32 + offset.y));
    }

    let polygon = Vector::<Vector<Point>>::from_iter([corners]);
    imgproc::polylines(frame, &polygon, true, green(), 2, imgproc::LINE_AA, 0)
}

pub fn draw_measurement(frame: &mut Mat, size: PhysicalSize) -> opencv::Result<()> {
    text(frame, &format!("W: {:.1} cm", size.width_cm), Point::new(10, 30), 0.7, green(), 2)?;
    text(frame, &format!("H: {:.1} cm", size.height_cm), Point::new(10, 60), 0.7, green(), 2)
}

/// Hershey fonts have no Cyrillic glyphs, so catalog names are not drawn.
pub fn draw_verdict(frame: &mut Mat, verdict: Verdict) -> opencv::Result<()> {
    let color = match verdict {
        Verdict::Correct => green(),
        Verdict::Incorrect => red(),
    };
    text(frame, &format!("Check: {verdict}"), Point::new(10, 90), 0.7, color, 2)
}

pub fn draw_distance(frame: &mut Mat, distance_cm: f64) -> opencv::Result<()> {
    let height = frame.rows();
    text(
        frame,
        &format!("Distance: {distance_cm:.0} cm (+/- to adjust)"),
        Point::new(10, height - 20),
        0.5,
        white(),
        1,
    )
}
