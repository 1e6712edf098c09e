//! Glucose-style restart scheduling.
//!
//! Tracks a fast (short window) and slow (long window) exponential moving average of the glue
//! (LBD) of learned clauses. A restart is suggested once the fast average rises well above the
//! slow one, indicating recent conflicts are less useful than the long term trend.

/// Fast/slow moving averages of conflict clause glue levels.
#[derive(Default)]
pub struct GlucoseEma {
    fast: f32,
    slow: f32,
    initialized: bool,
}

impl GlucoseEma {
    /// Record the glue of a newly learned clause.
    pub fn update(&mut self, glue: usize, fast_alpha: f32, slow_alpha: f32) {
        let glue = glue as f32;
        if !self.initialized {
            self.fast = glue;
            self.slow = glue;
            self.initialized = true;
        } else {
            self.fast += fast_alpha * (glue - self.fast);
            self.slow += slow_alpha * (glue - self.slow);
        }
    }

    /// Whether the short term average indicates the search is stuck and a restart is warranted.
    pub fn should_restart(&self, margin: f32) -> bool {
        self.initialized && self.fast > self.slow * margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_glue_never_restarts() {
        let mut ema = GlucoseEma::default();
        for _ in 0..100 {
            ema.update(5, 1.0 / 32.0, 1.0 / 4096.0);
        }
        assert!(!ema.should_restart(1.25));
    }

    #[test]
    fn rising_glue_triggers_restart() {
        let mut ema = GlucoseEma::default();
        for _ in 0..500 {
            ema.update(2, 1.0 / 32.0, 1.0 / 4096.0);
        }
        for _ in 0..20 {
            ema.update(40, 1.0 / 32.0, 1.0 / 4096.0);
        }
        assert!(ema.should_restart(1.25));
    }
}
