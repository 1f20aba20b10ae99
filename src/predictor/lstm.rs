//! Two stacked LSTM layers, dropout and a linear output unit, trained with
//! backpropagation through time.
//!
//! Gate weights are fused as `[input; forget; candidate; output]` blocks of
//! `hidden_size` rows each.

use super::optimizer::{Adam, Moments};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis, Ix1, Ix2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::Rng;

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}

/// Everything one time step needs for its backward pass.
#[derive(Debug, Clone)]
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
    h: Array1<f64>,
}

#[derive(Debug, Clone)]
struct LayerGrads {
    w: Array2<f64>,
    u: Array2<f64>,
    b: Array1<f64>,
}

#[derive(Debug, Clone, Default)]
struct LayerMoments {
    w: Option<Moments<Ix2>>,
    u: Option<Moments<Ix2>>,
    b: Option<Moments<Ix1>>,
}

#[derive(Debug, Clone)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    w: Array2<f64>,
    u: Array2<f64>,
    b: Array1<f64>,
    moments: LayerMoments,
}

impl LstmLayer {
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);
        let mut b = Array1::zeros(4 * hidden_size);
        // forget gate starts open
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            w: Array2::random_using((4 * hidden_size, input_size), dist, rng),
            u: Array2::random_using((4 * hidden_size, hidden_size), dist, rng),
            b,
            moments: LayerMoments::default(),
        }
    }

    fn zero_grads(&self) -> LayerGrads {
        LayerGrads {
            w: Array2::zeros(self.w.raw_dim()),
            u: Array2::zeros(self.u.raw_dim()),
            b: Array1::zeros(self.b.len()),
        }
    }

    fn step(
        &self,
        x: ArrayView1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (StepCache, Array1<f64>) {
        let hs = self.hidden_size;
        let z = self.w.dot(&x) + self.u.dot(h_prev) + &self.b;

        let i = z.slice(s![0..hs]).mapv(sigmoid);
        let f = z.slice(s![hs..2 * hs]).mapv(sigmoid);
        let g = z.slice(s![2 * hs..3 * hs]).mapv(f64::tanh);
        let o = z.slice(s![3 * hs..]).mapv(sigmoid);

        let c = &f * c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);
        let h = &o * &tanh_c;

        let cache = StepCache {
            x: x.to_owned(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            tanh_c,
            h,
        };
        (cache, c)
    }

    /// Runs the whole sequence from a zero state. Row `t` of `xs` is step `t`.
    fn forward(&self, xs: ArrayView2<f64>) -> Vec<StepCache> {
        let mut h = Array1::zeros(self.hidden_size);
        let mut c = Array1::zeros(self.hidden_size);
        let mut caches = Vec::with_capacity(xs.nrows());

        for x in xs.rows() {
            let (cache, c_next) = self.step(x, &h, &c);
            h = cache.h.clone();
            c = c_next;
            caches.push(cache);
        }
        caches
    }

    /// Accumulates parameter gradients into `grads` and returns the gradient
    /// with respect to each input row. `dh_out[t]` is the loss gradient
    /// arriving at the hidden output of step `t`.
    fn backward(
        &self,
        caches: &[StepCache],
        dh_out: &Array2<f64>,
        grads: &mut LayerGrads,
    ) -> Array2<f64> {
        let hs = self.hidden_size;
        let mut dx = Array2::zeros((caches.len(), self.input_size));
        let mut dh_next = Array1::<f64>::zeros(hs);
        let mut dc_next = Array1::<f64>::zeros(hs);

        for (t, cache) in caches.iter().enumerate().rev() {
            let dh = &dh_out.row(t) + &dh_next;

            let d_o = &dh * &cache.tanh_c * cache.o.mapv(|v| v * (1.0 - v));
            let dc = &dh * &cache.o * cache.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_i = &dc * &cache.g * cache.i.mapv(|v| v * (1.0 - v));
            let d_f = &dc * &cache.c_prev * cache.f.mapv(|v| v * (1.0 - v));
            let d_g = &dc * &cache.i * cache.g.mapv(|v| 1.0 - v * v);

            let mut dz = Array1::<f64>::zeros(4 * hs);
            dz.slice_mut(s![0..hs]).assign(&d_i);
            dz.slice_mut(s![hs..2 * hs]).assign(&d_f);
            dz.slice_mut(s![2 * hs..3 * hs]).assign(&d_g);
            dz.slice_mut(s![3 * hs..]).assign(&d_o);

            grads.w += &outer(&dz, &cache.x);
            grads.u += &outer(&dz, &cache.h_prev);
            grads.b += &dz;

            dx.row_mut(t).assign(&self.w.t().dot(&dz));
            dh_next = self.u.t().dot(&dz);
            dc_next = &dc * &cache.f;
        }
        dx
    }

    fn apply(&mut self, adam: &Adam, grads: &LayerGrads) {
        adam.update(&mut self.w, &grads.w, &mut self.moments.w);
        adam.update(&mut self.u, &grads.u, &mut self.moments.u);
        adam.update(&mut self.b, &grads.b, &mut self.moments.b);
    }
}

#[derive(Debug, Clone)]
pub struct Gradients {
    first: LayerGrads,
    second: LayerGrads,
    dense_w: Array1<f64>,
    dense_b: Array1<f64>,
}

impl Gradients {
    fn global_norm(&self) -> f64 {
        let sq = |a: f64, &x: &f64| a + x * x;
        let total = self.first.w.fold(0.0, sq)
            + self.first.u.fold(0.0, sq)
            + self.first.b.fold(0.0, sq)
            + self.second.w.fold(0.0, sq)
            + self.second.u.fold(0.0, sq)
            + self.second.b.fold(0.0, sq)
            + self.dense_w.fold(0.0, sq)
            + self.dense_b.fold(0.0, sq);
        total.sqrt()
    }

    fn scale(&mut self, k: f64) {
        for layer in [&mut self.first, &mut self.second] {
            layer.w *= k;
            layer.u *= k;
            layer.b *= k;
        }
        self.dense_w *= k;
        self.dense_b *= k;
    }
}

/// LSTM(units, sequences) → Dropout → LSTM(units) → Dropout → Dense(1).
#[derive(Debug, Clone)]
pub struct LstmNetwork {
    first: LstmLayer,
    second: LstmLayer,
    dense_w: Array1<f64>,
    dense_b: Array1<f64>,
    dense_moments: (Option<Moments<Ix1>>, Option<Moments<Ix1>>),
    dropout: f64,
}

impl LstmNetwork {
    pub fn new(n_features: usize, units: usize, dropout: f64, rng: &mut StdRng) -> Self {
        let first = LstmLayer::new(n_features, units, rng);
        let second = LstmLayer::new(units, units, rng);
        let limit = (1.0 / units as f64).sqrt();

        Self {
            first,
            second,
            dense_w: Array1::random_using(units, Uniform::new(-limit, limit), rng),
            dense_b: Array1::zeros(1),
            dense_moments: (None, None),
            dropout,
        }
    }

    pub fn n_features(&self) -> usize {
        self.first.input_size
    }

    pub fn units(&self) -> usize {
        self.first.hidden_size
    }

    /// Inference: dropout is off.
    pub fn predict_one(&self, window: ArrayView2<f64>) -> f64 {
        let c1 = self.first.forward(window);
        let h1 = stack_hidden(&c1, self.units());
        let c2 = self.second.forward(h1.view());
        match c2.last() {
            Some(last) => self.dense_w.dot(&last.h) + self.dense_b[0],
            None => self.dense_b[0],
        }
    }

    fn dropout_mask(&self, len: usize, rng: Option<&mut StdRng>) -> Array1<f64> {
        match rng {
            Some(rng) if self.dropout > 0.0 => {
                let keep = 1.0 - self.dropout;
                Array1::from_shape_fn(len, |_| if rng.gen_bool(keep) { 1.0 / keep } else { 0.0 })
            }
            _ => Array1::ones(len),
        }
    }

    /// Mean squared error over the batch and its gradients. Dropout masks are
    /// drawn from `rng`; pass `None` for a deterministic pass.
    pub fn batch_gradients(
        &self,
        x: ndarray::ArrayView3<f64>,
        y: ArrayView1<f64>,
        mut rng: Option<&mut StdRng>,
    ) -> (f64, Gradients) {
        let units = self.units();
        let batch = y.len().max(1) as f64;
        let mut grads = Gradients {
            first: self.first.zero_grads(),
            second: self.second.zero_grads(),
            dense_w: Array1::zeros(units),
            dense_b: Array1::zeros(1),
        };
        let mut loss = 0.0;

        for (window, &target) in x.outer_iter().zip(y.iter()) {
            let steps = window.nrows();

            let c1 = self.first.forward(window);
            let mut mask1 = Array2::<f64>::ones((steps, units));
            if let Some(r) = rng.as_deref_mut() {
                for mut row in mask1.rows_mut() {
                    row.assign(&self.dropout_mask(units, Some(&mut *r)));
                }
            }
            let h1 = stack_hidden(&c1, units) * &mask1;

            let c2 = self.second.forward(h1.view());
            let Some(last) = c2.last() else {
                continue;
            };
            let mask2 = self.dropout_mask(units, rng.as_deref_mut());
            let h2 = &last.h * &mask2;

            let pred = self.dense_w.dot(&h2) + self.dense_b[0];
            let err = pred - target;
            loss += err * err;

            let dy = 2.0 * err / batch;
            grads.dense_w.scaled_add(dy, &h2);
            grads.dense_b[0] += dy;

            let mut dh2 = Array2::<f64>::zeros((steps, units));
            dh2.row_mut(steps - 1).assign(&(&self.dense_w * dy * &mask2));
            let dx2 = self.second.backward(&c2, &dh2, &mut grads.second);

            let dh1 = dx2 * &mask1;
            self.first.backward(&c1, &dh1, &mut grads.first);
        }

        (loss / batch, grads)
    }

    /// Clips the gradients to `clip_norm` (if positive) and takes one Adam step.
    pub fn apply_gradients(&mut self, adam: &mut Adam, mut grads: Gradients, clip_norm: f64) {
        if clip_norm > 0.0 {
            let norm = grads.global_norm();
            if norm > clip_norm {
                grads.scale(clip_norm / norm);
            }
        }

        adam.next_step();
        self.first.apply(adam, &grads.first);
        self.second.apply(adam, &grads.second);
        adam.update(&mut self.dense_w, &grads.dense_w, &mut self.dense_moments.0);
        adam.update(&mut self.dense_b, &grads.dense_b, &mut self.dense_moments.1);
    }
}

fn stack_hidden(caches: &[StepCache], units: usize) -> Array2<f64> {
    let mut out = Array2::zeros((caches.len(), units));
    for (mut row, cache) in out.rows_mut().into_iter().zip(caches) {
        row.assign(&cache.h);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array3};
    use rand::SeedableRng;

    fn tiny_batch() -> (Array3<f64>, Array1<f64>) {
        let x = Array::from_shape_fn((3, 4, 2), |(b, t, f)| {
            ((b + 1) as f64 * 0.3 + t as f64 * 0.1 - f as f64 * 0.2).sin()
        });
        let y = Array1::from(vec![0.2, -0.1, 0.4]);
        (x, y)
    }

    #[test]
    fn test_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(3, 5, &mut rng);
        let caches = layer.forward(Array2::zeros((7, 3)).view());
        assert_eq!(caches.len(), 7);
        assert_eq!(caches[6].h.len(), 5);

        let net = LstmNetwork::new(3, 5, 0.2, &mut rng);
        assert!(net.predict_one(Array2::zeros((7, 3)).view()).is_finite());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = LstmNetwork::new(2, 3, 0.0, &mut rng);
        let (x, y) = tiny_batch();
        let (_, grads) = net.batch_gradients(x.view(), y.view(), None);

        let eps = 1e-6;
        let loss_at = |n: &LstmNetwork| n.batch_gradients(x.view(), y.view(), None).0;
        let check = |analytic: f64, plus: LstmNetwork, minus: LstmNetwork| {
            let numeric = (loss_at(&plus) - loss_at(&minus)) / (2.0 * eps);
            assert!(
                (analytic - numeric).abs() < 1e-5 * (1.0 + numeric.abs()),
                "analytic {} vs numeric {}",
                analytic,
                numeric
            );
        };

        for &(r, c) in &[(0, 0), (4, 1), (10, 0)] {
            let mut plus = net.clone();
            plus.first.w[[r, c]] += eps;
            let mut minus = net.clone();
            minus.first.w[[r, c]] -= eps;
            check(grads.first.w[[r, c]], plus, minus);
        }
        for &(r, c) in &[(1, 2), (7, 0)] {
            let mut plus = net.clone();
            plus.second.u[[r, c]] += eps;
            let mut minus = net.clone();
            minus.second.u[[r, c]] -= eps;
            check(grads.second.u[[r, c]], plus, minus);
        }
        for &k in &[3, 11] {
            let mut plus = net.clone();
            plus.first.b[k] += eps;
            let mut minus = net.clone();
            minus.first.b[k] -= eps;
            check(grads.first.b[k], plus, minus);
        }

        let mut plus = net.clone();
        plus.dense_w[1] += eps;
        let mut minus = net.clone();
        minus.dense_w[1] -= eps;
        check(grads.dense_w[1], plus, minus);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = LstmNetwork::new(2, 8, 0.0, &mut rng);
        let mut adam = Adam::new(0.01);
        let (x, y) = tiny_batch();

        let (before, _) = net.batch_gradients(x.view(), y.view(), None);
        for _ in 0..500 {
            let (_, grads) = net.batch_gradients(x.view(), y.view(), None);
            net.apply_gradients(&mut adam, grads, 1.0);
        }
        let (after, _) = net.batch_gradients(x.view(), y.view(), None);
        assert!(after < before * 0.5, "before {} after {}", before, after);
    }

    #[test]
    fn test_dropout_masks_scale_kept_units() {
        let mut rng = StdRng::seed_from_u64(11);
        let net = LstmNetwork::new(2, 400, 0.2, &mut rng);
        let mask = net.dropout_mask(400, Some(&mut rng));
        assert!(mask.iter().all(|&m| m == 0.0 || (m - 1.25).abs() < 1e-12));
        let kept = mask.iter().filter(|&&m| m > 0.0).count();
        assert!(kept > 260 && kept < 380, "kept {}", kept);
        assert!(net.dropout_mask(5, None).iter().all(|&m| m == 1.0));
    }
}
