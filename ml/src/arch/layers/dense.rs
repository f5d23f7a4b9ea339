use ndarray::{linalg, prelude::*};

use crate::arch::activations::ActFn;

/// A fully connected layer.
///
/// Parameters live in a flat slice owned by the caller, laid out as the
/// `dim.0 × dim.1` weight matrix followed by the `dim.1` biases. The bias is
/// always present.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata, consumed by the next backward pass.
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The `(inputs, outputs)` dimensions of the weight matrix.
    /// * `act_fn` - The optional activation applied to the affine output.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let zeros = Array2::zeros((1, 1));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros,
        }
    }

    /// Returns the amount of parameters this layer has, biases included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the `(inputs, outputs)` dimensions of this layer.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Returns the activation function of this layer, if any.
    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    /// Makes a forward pass, caching the input and pre-activation for the
    /// following `backward` call.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The activated output batch.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Array2<f32> {
        let (w, b) = self.view_params(params);

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        self.x = x.to_owned();

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|v| act_fn.f(v)),
            None => z.clone(),
        };
        self.z = z;

        a
    }

    /// Makes a forward pass without touching the backward metadata.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The activated output batch.
    pub fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Array2<f32> {
        let (w, b) = self.view_params(params);

        let mut z = x.dot(&w);
        z += &b;

        match &self.act_fn {
            Some(act_fn) => z.mapv(|v| act_fn.f(v)),
            None => z,
        }
    }

    /// Backpropagates the delta of the following layer through this one,
    /// writing this layer's gradient.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `grad` - This layer's slice of the gradient buffer, overwritten.
    /// * `d` - The delta flowing back from the following layer.
    ///
    /// # Returns
    /// The delta for the preceding layer.
    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], mut d: Array2<f32>) -> Array2<f32> {
        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad);
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params);
        d.dot(&w.t())
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> (ArrayView2<'a, f32>, ArrayView1<'a, f32>) {
        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size]).unwrap();
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..]).unwrap();
        (weights, biases)
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(&self, grad: &'a mut [f32]) -> (ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>) {
        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).unwrap();
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).unwrap();
        (dw, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::activations::ActFn;
    use ndarray::array;

    #[test]
    fn forward_is_affine() {
        // y = x*w + b with w = [[2]], b = [1]
        let mut layer = Dense::new((1, 1), None);
        let params = [2.0, 1.0];
        let x = array![[3.0], [0.0]];

        let out = layer.forward(&params, x.view());
        assert_eq!(out, array![[7.0], [1.0]]);
    }

    #[test]
    fn predict_matches_forward() {
        let mut layer = Dense::new((2, 2), Some(ActFn::relu()));
        let params = [0.5, -1.0, 1.0, 2.0, 0.1, -0.2];
        let x = array![[1.0, 2.0], [-1.0, 0.5]];

        let a = layer.forward(&params, x.view());
        let b = layer.predict(&params, x.view());
        assert_eq!(a, b);
    }

    #[test]
    fn backward_writes_expected_gradient() {
        let mut layer = Dense::new((1, 1), None);
        let params = [2.0, 1.0];
        let mut grad = [0.0, 0.0];
        let x = array![[3.0]];

        layer.forward(&params, x.view());

        // d = dL/dz = [[4]]: dw = x^T d = [[12]], db = [4], d_prev = d w^T = [[8]]
        let d_prev = layer.backward(&params, &mut grad, array![[4.0]]);
        assert_eq!(grad, [12.0, 4.0]);
        assert_eq!(d_prev, array![[8.0]]);
    }

    #[test]
    fn relu_masks_backward_delta() {
        let mut layer = Dense::new((1, 1), Some(ActFn::relu()));
        // w = [[1]], b = [0]: z equals x, negative rows are masked out.
        let params = [1.0, 0.0];
        let mut grad = [0.0, 0.0];
        let x = array![[-2.0], [5.0]];

        layer.forward(&params, x.view());
        layer.backward(&params, &mut grad, array![[1.0], [1.0]]);

        // Only the positive row contributes: dw = 5, db = 1.
        assert_eq!(grad, [5.0, 1.0]);
    }
}
