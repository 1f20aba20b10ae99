use crate::source::{ReserveSource, SourceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use table::AuxPoint;

/// Stand-in for exchange reserve data: a seeded multiplicative random walk,
/// one value per requested timestamp.
#[derive(Debug, Clone)]
pub struct SimulatedReserves {
    pub seed: u64,
    pub initial: f64,
    /// Maximum relative change per step
    pub step_volatility: f64,
}

impl Default for SimulatedReserves {
    fn default() -> Self {
        Self {
            seed: 42,
            initial: 2_000_000.0,
            step_volatility: 0.01,
        }
    }
}

impl SimulatedReserves {
    pub fn simulate(&self, timestamps: &[i64]) -> Vec<AuxPoint> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let vol = self.step_volatility.abs();
        let mut level = self.initial;

        timestamps
            .iter()
            .map(|&timestamp| {
                let point = AuxPoint { timestamp, value: level };
                if vol > 0.0 {
                    level *= 1.0 + rng.gen_range(-vol..vol);
                }
                point
            })
            .collect()
    }
}

impl ReserveSource for SimulatedReserves {
    fn name(&self) -> &str {
        "simulated_reserves"
    }

    async fn fetch_reserves(
        &self,
        _asset: &str,
        timestamps: &[i64],
    ) -> Result<Vec<AuxPoint>, SourceError> {
        Ok(self.simulate(timestamps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_point_per_timestamp_and_deterministic() {
        let sim = SimulatedReserves::default();
        let ts = [1, 2, 3, 4, 5];
        let a = sim.simulate(&ts);
        let b = sim.simulate(&ts);

        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a[0].value, 2_000_000.0);
        assert!(a.iter().all(|p| p.value > 0.0));
        assert_eq!(a.iter().map(|p| p.timestamp).collect::<Vec<_>>(), ts);
    }

    #[test]
    fn test_zero_volatility_is_flat() {
        let sim = SimulatedReserves {
            step_volatility: 0.0,
            ..SimulatedReserves::default()
        };
        assert!(sim.simulate(&[1, 2, 3]).iter().all(|p| p.value == 2_000_000.0));
    }
}
