//! Pinhole-camera size estimation.
//!
//! A rotated rectangle fitted around an object's outline is converted to a
//! physical size with `real_cm = pixel_len * distance_cm / focal_px`. The
//! longer side of the rectangle is always reported as the width.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Lens and sensor geometry used to derive the focal length in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub focal_length_mm: f64,
    pub sensor_width_mm: f64,
    pub frame_width_px: f64,
}

impl CameraCalibration {
    pub fn new(focal_length_mm: f64, sensor_width_mm: f64, frame_width_px: f64) -> Self {
        Self {
            focal_length_mm,
            sensor_width_mm,
            frame_width_px,
        }
    }

    /// Same lens and sensor, projected onto a frame `width_px` wide.
    pub fn for_frame_width(self, width_px: f64) -> Self {
        Self {
            frame_width_px: width_px,
            ..self
        }
    }

    pub fn focal_length_px(&self) -> f64 {
        self.frame_width_px * self.focal_length_mm / self.sensor_width_mm
    }
}

/// Minimum-area rectangle around a contour, in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: (f64, f64),
    pub size: (f64, f64),
    pub angle_deg: f64,
}

impl RotatedRect {
    pub fn new(center: (f64, f64), size: (f64, f64), angle_deg: f64) -> Self {
        Self {
            center,
            size,
            angle_deg,
        }
    }

    pub fn long_side(&self) -> f64 {
        self.size.0.max(self.size.1)
    }

    pub fn short_side(&self) -> f64 {
        self.size.0.min(self.size.1)
    }
}

/// Estimated real-world size of an object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width_cm: f64,
    pub height_cm: f64,
}

impl PhysicalSize {
    pub fn new(width_cm: f64, height_cm: f64) -> Self {
        Self {
            width_cm,
            height_cm,
        }
    }
}

pub fn real_length_cm(pixel_len: f64, distance_cm: f64, focal_px: f64) -> f64 {
    pixel_len * distance_cm / focal_px
}

/// Converts a fitted rectangle into centimeters at `distance_cm`.
///
/// Fails on rectangles with a zero, negative or non-finite side and on
/// unusable projection parameters instead of producing infinities.
pub fn estimate(rect: &RotatedRect, distance_cm: f64, focal_px: f64) -> Result<PhysicalSize> {
    let (w, h) = rect.size;
    if !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
        bail!("Degenerate rectangle {w:.2}x{h:.2} px");
    }
    if !focal_px.is_finite() || focal_px <= 0.0 {
        bail!("Focal length must be positive, got {focal_px} px");
    }
    if !distance_cm.is_finite() || distance_cm < 0.0 {
        bail!("Distance must be non-negative, got {distance_cm} cm");
    }

    Ok(PhysicalSize {
        width_cm: real_length_cm(rect.long_side(), distance_cm, focal_px),
        height_cm: real_length_cm(rect.short_side(), distance_cm, focal_px),
    })
}
