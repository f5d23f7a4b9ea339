use std::{io, num::NonZeroUsize};

use ml::{
    arch::{
        loss::{LossFn, Mse},
        Sequential,
    },
    dataset::Dataset,
    optimization::Optimizer,
};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use tokio::{sync::mpsc, task};

use crate::{
    config::{ModelConfig, TrainingConfig},
    error::{PipelineErr, Result},
    normalize::Bounds,
};

/// Progress emitted once per epoch, after the epoch's batch loop completed.
#[derive(Debug, Clone)]
pub enum TrainingEvent {
    Epoch {
        epoch: usize,
        /// Mean batch loss observed while optimizing.
        loss: f32,
        /// Full-pass mean squared error measured after the epoch.
        mse: f32,
    },
    Complete {
        epochs: usize,
    },
}

/// A trained model together with everything needed to evaluate and persist it.
///
/// The bounds are the ones computed when this run's data was normalized;
/// carrying them here is what guarantees the evaluator can never denormalize
/// with anything else.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub config: ModelConfig,
    pub net: Sequential,
    pub params: Vec<f32>,
    pub bounds: Bounds,
}

impl TrainedModel {
    /// Runs inference over a column of normalized inputs.
    ///
    /// # Returns
    /// The normalized predictions, one per input.
    pub fn predict(&self, xs: &[f32]) -> Result<Vec<f32>> {
        predict_column(&self.net, &self.params, xs)
    }
}

pub(crate) fn predict_column(net: &Sequential, params: &[f32], xs: &[f32]) -> Result<Vec<f32>> {
    let x = ArrayView2::from_shape((xs.len(), 1), xs).unwrap();
    let y = net.predict(params, x)?;
    Ok(y.iter().copied().collect())
}

/// One epoch's worth of state, moved onto the blocking pool and back so the
/// CPU-bound batch loop never stalls the runtime.
struct EpochStep {
    net: Sequential,
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: Box<dyn Optimizer + Send>,
    dataset: Dataset,
    batch_size: NonZeroUsize,
    rng: StdRng,
}

impl EpochStep {
    /// Reshuffles, runs the batch loop, and measures the full-pass metric.
    fn run(&mut self) -> ml::Result<(f32, f32)> {
        self.dataset.shuffle(&mut self.rng);

        let loss = self.net.backprop(
            &mut self.params,
            &mut self.grad,
            &Mse::new(),
            &mut self.optimizer,
            self.dataset.batches(self.batch_size),
        )?;

        let (x, y) = self.dataset.view();
        let y_pred = self.net.predict(&self.params, x)?;
        let mse = Mse::new().loss(y_pred.view(), y);

        Ok((loss, mse))
    }
}

/// Trains the configured model on an already-normalized dataset, streaming
/// one [`TrainingEvent`] per epoch.
///
/// The driver suspends in exactly two places: while an epoch runs on the
/// blocking pool, and while the epoch event is being sent. A dropped receiver
/// stops the run with `Cancelled` at the next epoch boundary; a non-finite
/// epoch loss stops it with `Diverged`.
///
/// # Arguments
/// * `model` - The topology to build and train.
/// * `training` - Hyperparameters of this run.
/// * `dataset` - The normalized training data.
/// * `bounds` - The normalization bounds of this run.
/// * `events` - The progress sink.
///
/// # Returns
/// The trained model, carrying the run's bounds.
pub async fn train(
    model: ModelConfig,
    training: TrainingConfig,
    dataset: Dataset,
    bounds: Bounds,
    events: mpsc::Sender<TrainingEvent>,
) -> Result<TrainedModel> {
    training.validate(dataset.len())?;

    let net = model.build()?;
    let num_params = net.num_params();
    let mut rng = training.rng();
    let mut params = vec![0.0; num_params];
    ml::init::xavier_uniform(&net, &mut params, &mut rng)?;

    log::info!(
        "training {num_params} parameters for {} epochs (batch size {})",
        training.epochs,
        training.batch_size
    );

    let mut step = EpochStep {
        net,
        params,
        grad: vec![0.0; num_params],
        optimizer: training.optimizer.build(num_params),
        dataset,
        batch_size: training.batch_size,
        rng,
    };

    let epochs = training.epochs.get();
    for epoch in 1..=epochs {
        let (step_back, outcome) = task::spawn_blocking(move || {
            let mut step = step;
            let outcome = step.run();
            (step, outcome)
        })
        .await
        .map_err(|e| PipelineErr::Io(io::Error::other(format!("epoch join error: {e}"))))?;

        step = step_back;
        let (loss, mse) = outcome?;

        if !loss.is_finite() {
            return Err(PipelineErr::Diverged { epoch });
        }

        log::debug!("epoch {epoch}: loss={loss:.6} mse={mse:.6}");

        let event = TrainingEvent::Epoch { epoch, loss, mse };
        if events.send(event).await.is_err() {
            return Err(PipelineErr::Cancelled);
        }
    }

    let _ = events.send(TrainingEvent::Complete { epochs }).await;

    Ok(TrainedModel {
        config: model,
        net: step.net,
        params: step.params,
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;

    fn identity_dataset(n: usize) -> Dataset {
        let xs: Vec<f32> = (0..n).map(|i| i as f32 / (n - 1) as f32).collect();
        let ys = xs.clone();
        Dataset::new(xs, ys, 1, 1).unwrap()
    }

    fn bounds() -> Bounds {
        Bounds {
            input_min: 0.0,
            input_max: 1.0,
            label_min: 0.0,
            label_max: 1.0,
        }
    }

    fn small_config(epochs: usize) -> (ModelConfig, TrainingConfig) {
        let model = ModelConfig {
            layers: vec![
                crate::config::LayerConfig::Dense {
                    dim: (1, 4),
                    act_fn: Some(crate::config::ActFnConfig::Relu),
                },
                crate::config::LayerConfig::Dense {
                    dim: (4, 1),
                    act_fn: None,
                },
            ],
        };
        let training = TrainingConfig {
            epochs: NonZeroUsize::new(epochs).unwrap(),
            batch_size: NonZeroUsize::new(8).unwrap(),
            optimizer: OptimizerConfig::GradientDescent { lr: 0.3 },
            seed: Some(3),
            ..TrainingConfig::default()
        };
        (model, training)
    }

    #[tokio::test]
    async fn emits_one_event_per_epoch_and_learns() {
        let (model, training) = small_config(10);
        let (tx, mut rx) = mpsc::channel(32);

        let trained = train(model, training, identity_dataset(32), bounds(), tx)
            .await
            .unwrap();

        let mut epoch_mse = Vec::new();
        let mut complete = false;
        while let Some(event) = rx.recv().await {
            match event {
                TrainingEvent::Epoch { mse, .. } => epoch_mse.push(mse),
                TrainingEvent::Complete { epochs } => {
                    assert_eq!(epochs, 10);
                    complete = true;
                }
            }
        }

        assert!(complete);
        assert_eq!(epoch_mse.len(), 10);
        assert!(
            epoch_mse.last().unwrap() < epoch_mse.first().unwrap(),
            "mse went from {:?} to {:?}",
            epoch_mse.first(),
            epoch_mse.last()
        );
        assert_eq!(trained.params.len(), 13);
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_training() {
        let (model, training) = small_config(3);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = train(model, training, identity_dataset(16), bounds(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineErr::Cancelled));
    }

    #[tokio::test]
    async fn runaway_loss_is_reported_as_divergence() {
        let (model, mut training) = small_config(5);
        training.optimizer = OptimizerConfig::GradientDescent { lr: 1e30 };

        let xs: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|_| 1e30).collect();
        let dataset = Dataset::new(xs, ys, 1, 1).unwrap();

        let (tx, _rx) = mpsc::channel(32);
        let err = train(model, training, dataset, bounds(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineErr::Diverged { .. }));
    }
}
