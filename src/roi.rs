use opencv::core::{Point, Rect};

/// Minimum drag, in pixels along each axis, for a selection to start tracking.
pub const MIN_ROI_PX: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseInput {
    Press(Point),
    Move(Point),
    Release(Point),
}

/// Region-of-interest selection state.
///
/// Each transition consumes the previous value and returns the next one so the
/// caller owns the state between frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RoiState {
    #[default]
    Idle,
    Selecting { origin: Point, current: Point },
    Tracking(Rect),
}

impl RoiState {
    pub fn on_mouse(self, input: MouseInput, min_px: i32) -> Self {
        match (self, input) {
            (_, MouseInput::Press(p)) => RoiState::Selecting {
                origin: p,
                current: p,
            },
            (RoiState::Selecting { origin, .. }, MouseInput::Move(p)) => RoiState::Selecting {
                origin,
                current: p,
            },
            (RoiState::Selecting { origin, .. }, MouseInput::Release(p)) => {
                let dx = p.x - origin.x;
                let dy = p.y - origin.y;
                if dx > min_px && dy > min_px {
                    RoiState::Tracking(Rect::new(origin.x, origin.y, dx, dy))
                } else {
                    RoiState::Idle
                }
            }
            (state, _) => state,
        }
    }

    pub fn reset(self) -> Self {
        RoiState::Idle
    }

    /// Region being analysed, if any.
    pub fn tracked(&self) -> Option<Rect> {
        match self {
            RoiState::Tracking(rect) => Some(*rect),
            _ => None,
        }
    }

    /// Press point and cursor of the drag in progress, if any. The cursor may
    /// sit above or left of the press point.
    pub fn selection(&self) -> Option<(Point, Point)> {
        match self {
            RoiState::Selecting { origin, current } => Some((*origin, *current)),
            _ => None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, RoiState::Tracking(_))
    }
}

/// Clips `roi` to a `width`x`height` frame. Returns `None` when nothing of it
/// is left inside the frame.
pub fn clamp_to_frame(roi: Rect, width: i32, height: i32) -> Option<Rect> {
    let x0 = roi.x.clamp(0, width);
    let y0 = roi.y.clamp(0, height);
    let x1 = (roi.x + roi.width).clamp(0, width);
    let y1 = (roi.y + roi.height).clamp(0, height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}
