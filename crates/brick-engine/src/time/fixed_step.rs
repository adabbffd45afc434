/// Fixed-rate update accumulator.
///
/// Real frame time is fed in with [`advance`](Self::advance), which returns
/// how many fixed updates to run. A frame that arrives up to
/// [`SNAP`](Self::SNAP) seconds early still counts as a full step, so a
/// display running at the update rate gets exactly one update per frame
/// despite timer jitter.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    accumulator: f32,
    max_steps: u32,
    updates: u64,
}

impl FixedStep {
    pub const SNAP: f32 = 0.001;

    /// `rate` updates per second; non-positive rates fall back to 60.
    pub fn new(rate: f32) -> Self {
        let rate = if rate > 0.0 && rate.is_finite() { rate } else { 60.0 };
        Self {
            step: 1.0 / rate,
            accumulator: 0.0,
            max_steps: 8,
            updates: 0,
        }
    }

    /// Cap on updates per frame; extra backlog is dropped.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Seconds per update.
    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Updates run so far.
    #[inline]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Simulated seconds so far.
    #[inline]
    pub fn time(&self) -> f64 {
        self.updates as f64 * f64::from(self.step)
    }

    /// Adds `dt` seconds and returns the number of updates due now.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }

        let mut due = 0;
        while self.accumulator + Self::SNAP >= self.step && due < self.max_steps {
            self.accumulator -= self.step;
            due += 1;
        }
        if due == self.max_steps {
            self.accumulator = self.accumulator.min(self.step);
        }
        // Snapped steps leave a tiny debt; don't carry it forward.
        self.accumulator = self.accumulator.max(0.0);

        self.updates += u64::from(due);
        due
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_update_per_matching_frame() {
        let mut fs = FixedStep::new(60.0);
        for _ in 0..120 {
            assert_eq!(fs.advance(1.0 / 60.0), 1);
        }
        assert_eq!(fs.updates(), 120);
        assert!((fs.time() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn jittered_frames_still_step_once() {
        let mut fs = FixedStep::new(60.0);
        for i in 0..60 {
            let jitter = if i % 2 == 0 { -0.0005 } else { 0.0005 };
            assert_eq!(fs.advance(1.0 / 60.0 + jitter), 1, "frame {i}");
        }
    }

    #[test]
    fn fast_display_skips_updates() {
        let mut fs = FixedStep::new(60.0);
        let total: u32 = (0..240).map(|_| fs.advance(1.0 / 240.0)).sum();
        assert!((59..=61).contains(&total), "{total}");
    }

    #[test]
    fn long_stall_is_capped() {
        let mut fs = FixedStep::new(60.0).with_max_steps(4);
        assert_eq!(fs.advance(1.0), 4);
        assert!(fs.advance(0.0) <= 1);
    }

    #[test]
    fn invalid_input_is_ignored() {
        let mut fs = FixedStep::new(0.0);
        assert_eq!(fs.step(), 1.0 / 60.0);
        assert_eq!(fs.advance(f32::NAN), 0);
        assert_eq!(fs.advance(-1.0), 0);
    }
}
