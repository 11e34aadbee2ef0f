//! Supercontinent cycle: alternating dispersal and assembly of landmasses.
//!
//! Each cycle lasts a random duration. The first half disperses the previous
//! supercontinent; the second half assembles the next one around `new_center`. When a
//! cycle ends, the next centre is drawn and the rollover is reported to the caller.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo;

/// Half of the cycle currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Landmasses drift apart
    Dispersal,
    /// Landmasses converge
    Assembly,
}

/// Cycle state.
#[derive(Debug, Clone)]
pub struct SupercontinentCycle {
    /// Current half-cycle
    pub phase: CyclePhase,
    /// Time into the current cycle (Myr)
    pub age_myr: f64,
    /// Length of the current cycle (Myr)
    pub duration_myr: f64,
    /// Centre of the supercontinent being dispersed
    pub old_center: [f32; 3],
    /// Centre of the supercontinent being assembled
    pub new_center: [f32; 3],
    min_duration_myr: f64,
    max_duration_myr: f64,
    rng: StdRng,
}

impl SupercontinentCycle {
    /// Start a cycle with durations drawn uniformly from `[min, max]` Myr.
    pub fn new(min_duration_myr: f32, max_duration_myr: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        // a zero-length cycle would never finish rolling over
        let lo = (min_duration_myr as f64).max(1e-3);
        let hi = (max_duration_myr as f64).max(lo);
        let duration_myr = rng.gen_range(lo..=hi);
        let old_center = random_point(&mut rng);
        let new_center = random_point(&mut rng);
        Self {
            phase: CyclePhase::Dispersal,
            age_myr: 0.0,
            duration_myr,
            old_center,
            new_center,
            min_duration_myr: lo,
            max_duration_myr: hi,
            rng,
        }
    }

    /// Advance by `dt_myr`; returns true when a cycle ended during this update.
    pub fn update(&mut self, dt_myr: f64) -> bool {
        self.age_myr += dt_myr;
        let mut rolled = false;
        while self.age_myr >= self.duration_myr {
            self.age_myr -= self.duration_myr;
            self.duration_myr = self.rng.gen_range(self.min_duration_myr..=self.max_duration_myr);
            self.old_center = self.new_center;
            self.new_center = random_point(&mut self.rng);
            rolled = true;
        }
        self.phase = if self.age_myr < 0.5 * self.duration_myr { CyclePhase::Dispersal } else { CyclePhase::Assembly };
        if rolled {
            log::info!(
                "[supercontinent] new cycle duration_myr={:.1} center={:?}",
                self.duration_myr,
                self.new_center
            );
        }
        rolled
    }
}

fn random_point(rng: &mut StdRng) -> [f32; 3] {
    geo::to_f32(geo::point_from_unit_samples(rng.gen::<f64>(), rng.gen::<f64>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_alternate_within_a_cycle() {
        let mut c = SupercontinentCycle::new(200.0, 200.0, 3);
        assert_eq!(c.phase, CyclePhase::Dispersal);
        assert!(!c.update(120.0));
        assert_eq!(c.phase, CyclePhase::Assembly);
        let center = c.new_center;
        assert!(c.update(100.0));
        assert_eq!(c.phase, CyclePhase::Dispersal);
        assert_eq!(c.old_center, center);
        assert!((c.age_myr - 20.0).abs() < 1e-9);
    }

    #[test]
    fn durations_stay_in_range() {
        let mut c = SupercontinentCycle::new(150.0, 500.0, 9);
        for _ in 0..50 {
            c.update(97.0);
            assert!((150.0..=500.0).contains(&c.duration_myr));
        }
    }
}
