/// Single-key commands polled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Closer,
    Farther,
    ResetRoi,
}

impl Command {
    /// Decodes a `wait_key` result. Returns `None` for no key or unbound keys.
    pub fn from_key(key: i32) -> Option<Self> {
        if key < 0 {
            return None;
        }
        match char::from_u32((key & 0xFF) as u32)? {
            'q' => Some(Command::Quit),
            '+' => Some(Command::Farther),
            '-' => Some(Command::Closer),
            'r' => Some(Command::ResetRoi),
            _ => None,
        }
    }
}

/// Assumed camera-to-object distance, adjusted in fixed steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    cm: f64,
    step_cm: f64,
    min_cm: f64,
}

impl Distance {
    pub fn new(initial_cm: f64, step_cm: f64, min_cm: f64) -> Self {
        Self {
            cm: initial_cm.max(min_cm),
            step_cm,
            min_cm,
        }
    }

    pub fn cm(&self) -> f64 {
        self.cm
    }

    pub fn increased(self) -> Self {
        Self {
            cm: self.cm + self.step_cm,
            ..self
        }
    }

    pub fn decreased(self) -> Self {
        Self {
            cm: (self.cm - self.step_cm).max(self.min_cm),
            ..self
        }
    }
}

impl Default for Distance {
    fn default() -> Self {
        Self::new(50.0, 5.0, 5.0)
    }
}
