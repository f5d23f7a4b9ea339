use std::num::NonZeroUsize;

use ml::{
    arch::{activations::ActFn, layers::Dense, Sequential},
    optimization::{Adam, GradientDescent, Optimizer},
};
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{PipelineErr, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActFnConfig {
    Relu,
    Sigmoid,
}

impl From<ActFnConfig> for ActFn {
    fn from(value: ActFnConfig) -> Self {
        match value {
            ActFnConfig::Relu => ActFn::relu(),
            ActFnConfig::Sigmoid => ActFn::sigmoid(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerConfig {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFnConfig>,
    },
}

/// Model topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub layers: Vec<LayerConfig>,
}

impl ModelConfig {
    /// The fixed horsepower→mpg topology: a 1 → 16 → 8 → 1 feed-forward net
    /// with rectified-linear hidden layers and a linear output.
    pub fn mpg_net() -> Self {
        Self {
            layers: vec![
                LayerConfig::Dense {
                    dim: (1, 16),
                    act_fn: Some(ActFnConfig::Relu),
                },
                LayerConfig::Dense {
                    dim: (16, 8),
                    act_fn: Some(ActFnConfig::Relu),
                },
                LayerConfig::Dense {
                    dim: (8, 1),
                    act_fn: None,
                },
            ],
        }
    }

    /// Returns the `(inputs, outputs)` dimensions of each layer.
    pub fn dims(&self) -> Vec<(usize, usize)> {
        self.layers
            .iter()
            .map(|layer| match *layer {
                LayerConfig::Dense { dim, .. } => dim,
            })
            .collect()
    }

    /// Returns the total parameter count, biases included.
    pub fn num_params(&self) -> usize {
        self.dims().iter().map(|(n, m)| (n + 1) * m).sum()
    }

    /// Checks that the topology is non-empty and that adjacent layers chain.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(PipelineErr::InvalidConfig(
                "model must have at least one layer".into(),
            ));
        }

        let dims = self.dims();
        for i in 1..dims.len() {
            let prev_m = dims[i - 1].1;
            let curr_n = dims[i].0;
            if prev_m != curr_n {
                return Err(PipelineErr::InvalidConfig(format!(
                    "layer {i}: input size ({curr_n}) does not match \
                     previous layer output size ({prev_m})"
                )));
            }
        }

        Ok(())
    }

    /// Validates the topology and builds the network.
    pub fn build(&self) -> Result<Sequential> {
        self.validate()?;

        let layers = self.layers.iter().map(|layer| match *layer {
            LayerConfig::Dense { dim, act_fn } => Dense::new(dim, act_fn.map(ActFn::from)),
        });

        Ok(Sequential::new(layers))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossFnConfig {
    Mse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerConfig {
    Adam { lr: f32, b1: f32, b2: f32, eps: f32 },
    GradientDescent { lr: f32 },
}

impl Default for OptimizerConfig {
    /// Adaptive-moment gradient descent with its usual defaults.
    fn default() -> Self {
        Self::Adam {
            lr: 1e-3,
            b1: 0.9,
            b2: 0.999,
            eps: 1e-7,
        }
    }
}

impl OptimizerConfig {
    /// Instantiates the configured optimizer for `len` parameters.
    pub fn build(&self, len: usize) -> Box<dyn Optimizer + Send> {
        match *self {
            Self::Adam { lr, b1, b2, eps } => Box::new(Adam::new(len, lr, b1, b2, eps)),
            Self::GradientDescent { lr } => Box::new(GradientDescent::new(lr)),
        }
    }
}

/// Hyperparameters of one training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub optimizer: OptimizerConfig,
    pub loss_fn: LossFnConfig,
    /// `None` keeps the shuffle and initialization nondeterministic.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: NonZeroUsize::new(50).unwrap(),
            batch_size: NonZeroUsize::new(32).unwrap(),
            optimizer: OptimizerConfig::default(),
            loss_fn: LossFnConfig::Mse,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Checks the hyperparameters against the dataset about to be trained on.
    pub fn validate(&self, dataset_len: usize) -> Result<()> {
        if self.batch_size.get() > dataset_len {
            return Err(PipelineErr::InvalidConfig(format!(
                "batch_size ({}) exceeds dataset size ({dataset_len} samples)",
                self.batch_size
            )));
        }
        Ok(())
    }

    /// The generator driving this run's shuffles and initialization.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpg_net_is_valid_and_sized() {
        let config = ModelConfig::mpg_net();
        config.validate().unwrap();

        assert_eq!(config.dims(), vec![(1, 16), (16, 8), (8, 1)]);
        assert_eq!(config.num_params(), 177);
        assert_eq!(config.build().unwrap().num_params(), 177);
    }

    #[test]
    fn mismatched_layers_are_rejected() {
        let config = ModelConfig {
            layers: vec![
                LayerConfig::Dense {
                    dim: (1, 16),
                    act_fn: Some(ActFnConfig::Relu),
                },
                LayerConfig::Dense {
                    dim: (8, 1),
                    act_fn: None,
                },
            ],
        };

        assert!(matches!(
            config.validate(),
            Err(PipelineErr::InvalidConfig(_))
        ));
    }

    #[test]
    fn batch_size_must_fit_the_dataset() {
        let config = TrainingConfig::default();
        assert!(config.validate(1000).is_ok());
        assert!(config.validate(10).is_err());
    }
}
