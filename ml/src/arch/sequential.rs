use ndarray::{Array2, ArrayView2};

use super::{layers::Dense, loss::LossFn};
use crate::{
    error::{MlErr, Result},
    optimization::Optimizer,
};

/// A sequential model: information flows forward when computing an output and
/// backward when computing the deltas of its layers.
///
/// The model owns no parameters; callers pass the flat parameter buffer (and,
/// while training, a gradient buffer of the same length) on every call.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Returns the amount of parameters in the model.
    pub fn num_params(&self) -> usize {
        self.layers.iter().map(Dense::size).sum()
    }

    /// Returns the layers of this model, in forward order.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Makes a forward pass through the network, caching per-layer metadata
    /// for a following backward pass.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The prediction for the given input or an error if the buffer does not
    /// match the model size.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_len("params", params.len())?;

        let mut rest = params;
        let mut a = x.to_owned();

        for layer in self.layers.iter_mut() {
            let (head, tail) = rest.split_at(layer.size());
            a = layer.forward(head, a.view());
            rest = tail;
        }

        Ok(a)
    }

    /// Makes an inference-only forward pass, leaving the backward metadata
    /// untouched.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The prediction for the given input.
    pub fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_len("params", params.len())?;

        let mut rest = params;
        let mut a = x.to_owned();

        for layer in &self.layers {
            let (head, tail) = rest.split_at(layer.size());
            a = layer.predict(head, a.view());
            rest = tail;
        }

        Ok(a)
    }

    // NOTE: getting the exact epoch loss would require forwarding over all
    // batches again at the end, so it is approximated by averaging the loss
    // observed at each batch.
    /// Runs one epoch of training over the provided batches. **`params` gets
    /// updated** after each batch according to the optimization algorithm.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer.
    /// * `grad` - A buffer for writing the gradient on each batch pass.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the weights.
    /// * `batches` - The batches of data.
    ///
    /// # Returns
    /// The mean batch loss of the epoch.
    pub fn backprop<'a, L, O, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        batches: I,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        self.check_len("params", params.len())?;
        self.check_len("grad", grad.len())?;

        let mut offsets = Vec::with_capacity(self.layers.len());
        let mut start = 0;
        for layer in &self.layers {
            offsets.push((start, start + layer.size()));
            start += layer.size();
        }

        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            let y_pred = self.forward(params, x)?;
            total_loss += loss_fn.loss(y_pred.view(), y);
            num_batches += 1;

            let mut d = loss_fn.loss_prime(y_pred.view(), y);
            for (layer, &(start, end)) in self.layers.iter_mut().rev().zip(offsets.iter().rev()) {
                d = layer.backward(&params[start..end], &mut grad[start..end], d);
            }

            optimizer.update_params(grad, params)?;
        }

        if num_batches == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(total_loss / num_batches as f32)
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.num_params();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{activations::ActFn, loss::Mse},
        optimization::{Adam, GradientDescent},
    };

    #[test]
    fn num_params_counts_biases() {
        let net = Sequential::new([
            Dense::new((1, 16), Some(ActFn::relu())),
            Dense::new((16, 8), Some(ActFn::relu())),
            Dense::new((8, 1), None),
        ]);

        // (1+1)*16 + (16+1)*8 + (8+1)*1 = 32 + 136 + 9
        assert_eq!(net.num_params(), 177);
    }

    #[test]
    fn rejects_wrong_buffer_sizes() {
        let mut net = Sequential::new([Dense::new((1, 1), None)]);
        let x = array![[1.0]];

        let err = net.forward(&[0.0; 3], x.view()).unwrap_err();
        assert!(matches!(
            err,
            MlErr::SizeMismatch {
                got: 3,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn gradient_descent_fits_a_line() {
        // y = 2x + 1 with a single linear unit.
        let mut net = Sequential::new([Dense::new((1, 1), None)]);
        let mut params = vec![0.5, 0.0];
        let mut grad = vec![0.0; 2];
        let mut optimizer = GradientDescent::new(0.05);
        let mse = Mse::new();

        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![[1.0], [3.0], [5.0], [7.0]];

        let mut loss = f32::MAX;
        for _ in 0..500 {
            let batches = std::iter::once((x.view(), y.view()));
            loss = net
                .backprop(&mut params, &mut grad, &mse, &mut optimizer, batches)
                .unwrap();
        }

        assert!(loss < 1e-3, "loss did not converge: {loss}");
        assert!((params[0] - 2.0).abs() < 1e-2, "w = {}", params[0]);
        assert!((params[1] - 1.0).abs() < 1e-2, "b = {}", params[1]);
    }

    #[test]
    fn adam_reduces_the_loss() {
        let mut net = Sequential::new([Dense::new((1, 1), None)]);
        let mut params = vec![0.0, 0.0];
        let mut grad = vec![0.0; 2];
        let mut optimizer = Adam::new(2, 0.05, 0.9, 0.999, 1e-7);
        let mse = Mse::new();

        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![[1.0], [3.0], [5.0], [7.0]];

        let first = net
            .backprop(
                &mut params,
                &mut grad,
                &mse,
                &mut optimizer,
                std::iter::once((x.view(), y.view())),
            )
            .unwrap();

        let mut last = first;
        for _ in 0..300 {
            last = net
                .backprop(
                    &mut params,
                    &mut grad,
                    &mse,
                    &mut optimizer,
                    std::iter::once((x.view(), y.view())),
                )
                .unwrap();
        }

        assert!(last < first * 0.1, "first = {first}, last = {last}");
    }

    #[test]
    fn empty_batches_are_an_error() {
        let mut net = Sequential::new([Dense::new((1, 1), None)]);
        let mut params = vec![0.0, 0.0];
        let mut grad = vec![0.0; 2];
        let mut optimizer = GradientDescent::new(0.1);

        let err = net
            .backprop(
                &mut params,
                &mut grad,
                &Mse::new(),
                &mut optimizer,
                std::iter::empty(),
            )
            .unwrap_err();
        assert!(matches!(err, MlErr::EmptyDataset));
    }
}
