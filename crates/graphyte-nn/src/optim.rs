//! Gradient clipping and SGD with momentum.

use ndarray::Array2;

/// Frobenius norm of a matrix.
pub fn frobenius_norm(m: &Array2<f32>) -> f32 {
    m.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Rescale `grad` in place so its Frobenius norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_by_norm(grad: &mut Array2<f32>, max_norm: f32) -> f32 {
    let norm = frobenius_norm(grad);
    if norm > max_norm {
        let scale = max_norm / norm;
        grad.mapv_inplace(|g| g * scale);
    }
    norm
}

/// SGD with momentum.
///
/// Implements `v = momentum * v + lr * grad; w -= v`. The velocity buffer is
/// created on the first step and lives as long as the optimizer.
#[derive(Debug, Clone)]
pub struct Momentum {
    momentum: f32,
    velocity: Option<Array2<f32>>,
}

impl Momentum {
    pub fn new(momentum: f32) -> Self {
        Self {
            momentum,
            velocity: None,
        }
    }

    /// Apply one update to `params`.
    pub fn step(&mut self, params: &mut Array2<f32>, grads: &Array2<f32>, learning_rate: f32) {
        let momentum = self.momentum;
        let velocity = self
            .velocity
            .get_or_insert_with(|| Array2::zeros(params.dim()));
        velocity.zip_mut_with(grads, |v, &g| *v = momentum * *v + learning_rate * g);
        *params -= &*velocity;
    }

    /// Current velocity, if any step has run.
    pub fn velocity(&self) -> Option<&Array2<f32>> {
        self.velocity.as_ref()
    }
}
