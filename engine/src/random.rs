//! Injectable random samplers for plate kinematics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A parameterless source of real numbers.
///
/// Any `FnMut() -> f32` closure is a generator, so tests can pass constants.
pub trait Generator {
    /// Draw the next value.
    fn sample(&mut self) -> f32;
}

impl<F: FnMut() -> f32> Generator for F {
    fn sample(&mut self) -> f32 {
        self()
    }
}

/// Normal distribution sampled with the Box–Muller transform over a seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct NormalGenerator {
    /// Distribution mean
    pub mean: f32,
    /// Standard deviation
    pub std_dev: f32,
    rng: StdRng,
    spare: Option<f64>,
}

impl NormalGenerator {
    /// New sampler; identical seeds reproduce identical sequences.
    pub fn new(mean: f32, std_dev: f32, seed: u64) -> Self {
        Self { mean, std_dev, rng: StdRng::seed_from_u64(seed), spare: None }
    }

    /// Angular plate speed in rad/Myr, fit to Larson et al. 1997.
    pub fn plate_speed(seed: u64) -> Self {
        Self::new(0.00687, 0.00380, seed)
    }

    /// Plate density offset in kg/m³ (Carlson & Raskin 1984).
    pub fn density_offset(seed: u64) -> Self {
        Self::new(0.0, 40.0, seed)
    }

    fn standard(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        // u1 in (0, 1] keeps ln finite
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        let r = (-2.0 * u1.ln()).sqrt();
        let (s, c) = (2.0 * std::f64::consts::PI * u2).sin_cos();
        self.spare = Some(r * s);
        r * c
    }
}

impl Generator for NormalGenerator {
    fn sample(&mut self) -> f32 {
        (self.mean as f64 + self.std_dev as f64 * self.standard()) as f32
    }
}
