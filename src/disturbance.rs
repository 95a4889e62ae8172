use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::{NoiseKind, SimParams};

// Shortest outlier that will be scheduled, in seconds.
const MIN_OUTLIER_DURATION: f64 = 0.001;

// A transient additive fault riding on top of the continuous noise. At most
// one is in flight at a time.
#[derive(Debug, Clone, Copy)]
struct ActiveOutlier {
    remaining: f64,
    magnitude: f64,
}

pub struct DisturbanceGenerator {
    rng: StdRng,
    outlier: Option<ActiveOutlier>,
}

impl DisturbanceGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            outlier: None,
        }
    }

    // Corrupts one plant sample. Draws a fresh noise sample every call (no
    // correlation across ticks), then runs the outlier lifecycle: when none
    // is active, a Bernoulli trial with probability outlier_frequency * dt
    // may start one; an active outlier adds its magnitude and burns down by
    // dt, clearing once remaining hits zero. A newly started outlier already
    // contributes on its starting tick.
    //
    // The trial probability is deliberately not clamped; callers keep
    // outlier_frequency * dt inside [0, 1].
    pub fn apply(&mut self, true_value: f64, params: &SimParams, dt: f64) -> (f64, bool) {
        let mut value = true_value;

        if params.noise_enabled {
            value += self.noise_sample(params);
        }

        if params.outlier_enabled {
            if self.outlier.is_none() && self.rng.gen::<f64>() < params.outlier_frequency * dt {
                self.outlier = Some(self.start_outlier(params));
            }

            if let Some(outlier) = &mut self.outlier {
                value += outlier.magnitude;
                outlier.remaining -= dt;
                if outlier.remaining <= 0.0 {
                    self.outlier = None;
                }
            }
        }

        (value, self.outlier.is_some())
    }

    // Magnitude and remaining duration of the outlier in flight, if any.
    pub fn active_outlier(&self) -> Option<(f64, f64)> {
        self.outlier.map(|o| (o.magnitude, o.remaining))
    }

    fn noise_sample(&mut self, params: &SimParams) -> f64 {
        match params.noise_kind {
            NoiseKind::Gaussian => {
                let z: f64 = self.rng.sample(StandardNormal);
                params.noise_amplitude * z
            }
            NoiseKind::Uniform => self.uniform_symmetric(params.noise_amplitude),
        }
    }

    fn start_outlier(&mut self, params: &SimParams) -> ActiveOutlier {
        let lo = params.outlier_max_duration.min(MIN_OUTLIER_DURATION);
        let hi = params.outlier_max_duration.max(MIN_OUTLIER_DURATION);
        ActiveOutlier {
            remaining: self.rng.gen_range(lo..=hi),
            magnitude: self.uniform_symmetric(params.outlier_amplitude),
        }
    }

    fn uniform_symmetric(&mut self, amplitude: f64) -> f64 {
        let a = amplitude.abs();
        self.rng.gen_range(-a..=a)
    }
}
