use log::{debug, info};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::estimate::PhysicalSize;

/// Rolling statistics over the most recent estimates of the tracked object.
#[derive(Debug, Clone)]
pub struct MeasurementStats {
    window: VecDeque<PhysicalSize>,
    capacity: usize,
    count: usize,
    min_width_cm: f64,
    max_width_cm: f64,
    started: Instant,
}

impl MeasurementStats {
    pub fn new(capacity: usize) -> Self {
        debug!("Initializing measurement statistics (window of {})", capacity);
        MeasurementStats {
            window: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            count: 0,
            min_width_cm: f64::MAX,
            max_width_cm: 0.0,
            started: Instant::now(),
        }
    }

    pub fn update(&mut self, size: PhysicalSize) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(size);
        self.count += 1;

        self.min_width_cm = self.min_width_cm.min(size.width_cm);
        self.max_width_cm = self.max_width_cm.max(size.width_cm);

        if self.count % 100 == 0 {
            if let Some(mean) = self.mean() {
                info!(
                    "{} measurements in {:.1}s: mean {:.1}x{:.1} cm, width range {:.1}..{:.1} cm",
                    self.count,
                    self.elapsed().as_secs_f32(),
                    mean.width_cm,
                    mean.height_cm,
                    self.min_width_cm,
                    self.max_width_cm
                );
            }
        } else {
            debug!(
                "Measurement #{}: {:.2}x{:.2} cm",
                self.count, size.width_cm, size.height_cm
            );
        }
    }

    /// Mean of the estimates currently in the window.
    pub fn mean(&self) -> Option<PhysicalSize> {
        if self.window.is_empty() {
            return None;
        }
        let n = self.window.len() as f64;
        let (w, h) = self
            .window
            .iter()
            .fold((0.0, 0.0), |(w, h), s| (w + s.width_cm, h + s.height_cm));
        Some(PhysicalSize::new(w / n, h / n))
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.count = 0;
        self.min_width_cm = f64::MAX;
        self.max_width_cm = 0.0;
        self.started = Instant::now();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for MeasurementStats {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_mean() {
        assert_eq!(MeasurementStats::new(5).mean(), None);
    }

    #[test]
    fn mean_covers_only_the_window() {
        let mut stats = MeasurementStats::new(2);
        stats.update(PhysicalSize::new(100.0, 100.0));
        stats.update(PhysicalSize::new(10.0, 4.0));
        stats.update(PhysicalSize::new(20.0, 6.0));

        assert_eq!(stats.len(), 2);
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.mean(), Some(PhysicalSize::new(15.0, 5.0)));
    }

    #[test]
    fn reset_clears_everything() {
        let mut stats = MeasurementStats::default();
        stats.update(PhysicalSize::new(10.0, 4.0));
        stats.reset();

        assert_eq!(stats.count(), 0);
        assert_eq!(stats.mean(), None);
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let mut stats = MeasurementStats::new(0);
        stats.update(PhysicalSize::new(1.0, 1.0));
        stats.update(PhysicalSize::new(3.0, 2.0));
        assert_eq!(stats.mean(), Some(PhysicalSize::new(3.0, 2.0)));
    }
}
