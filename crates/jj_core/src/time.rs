//! Frame clock producing the simulation's `time_mult`.
//!
//! Gameplay code never sees seconds. Every incremental quantity is scaled by
//! `time_mult`, where 1.0 is exactly one frame at the 60 Hz reference rate. A
//! 120 Hz display therefore ticks with `time_mult == 0.5`.

use std::time::Instant;

pub const REFERENCE_FPS: f32 = 60.0;

const FPS_SAMPLE_COUNT: usize = 60;

pub struct FrameClock {
    /// Largest multiplier handed to the simulation in one frame.
    pub max_time_mult: f32,
    pub time_mult: f32,
    pub frame_count: u64,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            max_time_mult: 2.0,
            time_mult: 1.0,
            frame_count: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
        }
    }

    /// Measure the wall-clock delta since the last call and derive `time_mult`.
    pub fn begin_frame(&mut self) -> f32 {
        let now = Instant::now();
        self.real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(self.real_dt)
    }

    /// Feed an explicit delta in seconds. Used by headless runs and tests.
    pub fn advance(&mut self, dt_seconds: f64) -> f32 {
        self.frame_count += 1;

        let mut time_mult = (dt_seconds as f32) * REFERENCE_FPS;
        // Spiral-of-death cap
        if time_mult > self.max_time_mult {
            log::warn!(
                "Frame took {:.1}ms, capping time multiplier to {}",
                dt_seconds * 1000.0,
                self.max_time_mult
            );
            time_mult = self.max_time_mult;
        }
        self.time_mult = time_mult;

        self.fps_samples[self.fps_sample_index] = dt_seconds;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };

        time_mult
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_frame_is_one() {
        let mut clock = FrameClock::new();
        let tm = clock.advance(1.0 / 60.0);
        assert!((tm - 1.0).abs() < 1e-4);
        assert_eq!(clock.frame_count, 1);
    }

    #[test]
    fn test_high_refresh_rate_halves_multiplier() {
        let mut clock = FrameClock::new();
        let tm = clock.advance(1.0 / 120.0);
        assert!((tm - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut clock = FrameClock::new();
        let tm = clock.advance(1.0);
        assert_eq!(tm, clock.max_time_mult);
    }
}
