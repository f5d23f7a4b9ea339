use rand::Rng;

use crate::{
    arch::Sequential,
    error::{MlErr, Result},
};

/// Fills a flat parameter buffer layer by layer: Xavier-uniform weights,
/// zero biases.
///
/// The Xavier bound for a layer with dimensions `(fan_in, fan_out)` is
/// `sqrt(6 / (fan_in + fan_out))`.
///
/// # Arguments
/// * `net` - The model whose layout dictates the buffer layout.
/// * `params` - The buffer to fill; must match the model size.
/// * `rng` - A random number generator.
///
/// # Returns
/// An error if the buffer does not match the model size.
pub fn xavier_uniform<R: Rng>(net: &Sequential, params: &mut [f32], rng: &mut R) -> Result<()> {
    if params.len() != net.num_params() {
        return Err(MlErr::SizeMismatch {
            what: "params",
            got: params.len(),
            expected: net.num_params(),
        });
    }

    let mut rest = params;
    for layer in net.layers() {
        let (n, m) = layer.dim();
        let (head, tail) = rest.split_at_mut(layer.size());
        let (weights, biases) = head.split_at_mut(n * m);

        let bound = (6. / (n + m) as f32).sqrt();
        for w in weights.iter_mut() {
            *w = rng.random_range(-bound..=bound);
        }
        biases.fill(0.);

        rest = tail;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::arch::{activations::ActFn, layers::Dense};

    #[test]
    fn respects_bounds_and_zeroes_biases() {
        let net = Sequential::new([
            Dense::new((1, 16), Some(ActFn::relu())),
            Dense::new((16, 8), Some(ActFn::relu())),
            Dense::new((8, 1), None),
        ]);
        let mut params = vec![f32::NAN; net.num_params()];
        let mut rng = StdRng::seed_from_u64(7);

        xavier_uniform(&net, &mut params, &mut rng).unwrap();

        assert!(params.iter().all(|p| p.is_finite()));

        // First layer: 16 weights bounded by sqrt(6/17), then 16 zero biases.
        let bound = (6.0f32 / 17.0).sqrt();
        assert!(params[..16].iter().all(|w| w.abs() <= bound));
        assert!(params[16..32].iter().all(|&b| b == 0.0));
    }

    #[test]
    fn same_seed_same_params() {
        let net = Sequential::new([Dense::new((1, 4), Some(ActFn::relu()))]);
        let mut a = vec![0.0; net.num_params()];
        let mut b = vec![0.0; net.num_params()];

        xavier_uniform(&net, &mut a, &mut StdRng::seed_from_u64(42)).unwrap();
        xavier_uniform(&net, &mut b, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(a, b);
    }
}
