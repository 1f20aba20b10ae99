//! Adam (adaptive moment estimation).

use ndarray::{Array, Dimension, Zip};
use serde::{Deserialize, Serialize};

/// First and second moment estimates for one parameter tensor.
#[derive(Debug, Clone)]
pub struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    #[serde(skip)]
    t: i32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Advances the time step. Call once per batch, before the updates.
    pub fn next_step(&mut self) {
        self.t += 1;
    }

    pub fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        slot: &mut Option<Moments<D>>,
    ) {
        let t = self.t.max(1);
        let Moments { m, v } = slot.get_or_insert_with(|| Moments {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        });

        m.zip_mut_with(grad, |m, &g| *m = self.beta1 * *m + (1.0 - self.beta1) * g);
        v.zip_mut_with(grad, |v, &g| *v = self.beta2 * *v + (1.0 - self.beta2) * g * g);

        let bc1 = 1.0 - self.beta1.powi(t);
        let bc2 = 1.0 - self.beta2.powi(t);
        Zip::from(param).and(&*m).and(&*v).for_each(|p, &m, &v| {
            *p -= self.learning_rate * (m / bc1) / ((v / bc2).sqrt() + self.epsilon);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Ix1};

    #[test]
    fn test_minimizes_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut p = array![0.0, 10.0];
        let mut slot: Option<Moments<Ix1>> = None;

        for _ in 0..3000 {
            let grad = p.mapv(|x| 2.0 * (x - 3.0));
            adam.next_step();
            adam.update(&mut p, &grad, &mut slot);
        }

        assert!((p[0] - 3.0).abs() < 0.05, "p[0] = {}", p[0]);
        assert!((p[1] - 3.0).abs() < 0.05, "p[1] = {}", p[1]);
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.01);
        let mut p = array![1.0];
        let mut slot: Option<Moments<Ix1>> = None;
        adam.next_step();
        adam.update(&mut p, &array![5.0], &mut slot);
        // bias-corrected m / sqrt(v) == sign(g) on the first step
        assert!((p[0] - 0.99).abs() < 1e-6);
    }
}
