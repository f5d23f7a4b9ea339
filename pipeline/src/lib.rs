pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod model_io;
pub mod normalize;
pub mod session;
pub mod slot;

pub use error::{PipelineErr, Result};
pub use session::{TrainedModel, TrainingEvent};
pub use slot::ModelSlot;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    config::{ModelConfig, TrainingConfig},
    data::Sample,
    eval::Evaluation,
};

/// Progress and results streamed to the UI sink along the run path.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The filtered working set, ready to plot.
    DataLoaded { samples: Vec<Sample> },
    /// Per-layer dimensions of the freshly built model.
    ModelSummary {
        layers: Vec<(usize, usize)>,
        num_params: usize,
    },
    Training(TrainingEvent),
    EvaluationReady(Evaluation),
}

/// Runs the whole pipeline: fetch → normalize → build → train → store →
/// evaluate.
///
/// The trained model replaces whatever the slot held; the evaluation uses
/// the new model and the bounds of this very run. Failures are returned to
/// the caller, which owns surfacing them.
///
/// # Arguments
/// * `model` - The topology to train.
/// * `training` - Hyperparameters of this run.
/// * `slot` - The slot receiving the trained model.
/// * `events` - The progress sink.
///
/// # Returns
/// The trained model, also stored in the slot.
pub async fn run(
    model: ModelConfig,
    training: TrainingConfig,
    slot: Arc<ModelSlot>,
    events: mpsc::Sender<PipelineEvent>,
) -> Result<Arc<TrainedModel>> {
    let client = reqwest::Client::new();
    let mut samples = data::fetch_cars(&client).await?;

    let _ = events
        .send(PipelineEvent::DataLoaded {
            samples: samples.clone(),
        })
        .await;

    let mut rng = training.rng();
    let (dataset, bounds) = normalize::prepare(&mut samples, &mut rng)?;

    let _ = events
        .send(PipelineEvent::ModelSummary {
            layers: model.dims(),
            num_params: model.num_params(),
        })
        .await;

    // Forward per-epoch progress into the caller's sink; a closed sink makes
    // the forwarder give up, which cancels training at the next boundary.
    let (train_tx, mut train_rx) = mpsc::channel(16);
    let progress = events.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = train_rx.recv().await {
            if progress
                .send(PipelineEvent::Training(event))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let trained = session::train(model, training, dataset, bounds, train_tx).await;
    let _ = forwarder.await;
    let trained = Arc::new(trained?);

    slot.store(trained.clone());
    log::info!("training run stored; evaluating");

    let evaluation = eval::evaluate(&trained, &samples)?;
    let _ = events.send(PipelineEvent::EvaluationReady(evaluation)).await;

    Ok(trained)
}
