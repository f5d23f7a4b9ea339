use super::Optimizer;
use crate::error::{MlErr, Result};

/// Adaptive moment estimation.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// Creates a new `Adam` with the usual defaults: learning rate 1e-3,
    /// beta1 0.9, beta2 0.999, epsilon 1e-7.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    pub fn with_defaults(len: usize) -> Self {
        Self::new(len, 1e-3, 0.9, 0.999, 1e-7)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() || grad.len() != self.v.len() {
            return Err(MlErr::SizeMismatch {
                what: "optimizer buffers",
                got: grad.len(),
                expected: self.v.len(),
            });
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((p, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_against_the_gradient() {
        let mut adam = Adam::new(2, 0.1, 0.9, 0.999, 1e-7);
        let mut params = [1.0, -1.0];

        adam.update_params(&[0.5, -0.5], &mut params).unwrap();

        // With bias correction the first step has magnitude ~lr.
        assert!(params[0] < 1.0);
        assert!(params[1] > -1.0);
        assert!((params[0] - 0.9).abs() < 1e-3);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut adam = Adam::with_defaults(2);
        let mut params = [0.0; 3];

        assert!(adam.update_params(&[0.0; 3], &mut params).is_err());
    }
}
