use ndarray::Array;

use crate::{data::Sample, error::Result, session::TrainedModel};

/// How many points the evaluation probe spans across the normalized domain.
pub const PROBE_POINTS: usize = 100;

/// A single chart point in original (denormalized) units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionPoint {
    pub x: f32,
    pub y: f32,
}

/// The two series rendered on the evaluation scatter.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// The samples the model was trained on, as-is.
    pub original: Vec<PredictionPoint>,
    /// The model's predicted curve over a uniform probe of the input range.
    pub predicted: Vec<PredictionPoint>,
}

/// Probes the model over a uniform [0, 1] grid and denormalizes both
/// coordinates with the bounds of the model's own training run.
///
/// # Arguments
/// * `model` - The trained model to probe.
/// * `samples` - The original working set, for the reference series.
///
/// # Returns
/// The original and predicted series.
pub fn evaluate(model: &TrainedModel, samples: &[Sample]) -> Result<Evaluation> {
    let probe = Array::linspace(0.0f32, 1.0, PROBE_POINTS).to_vec();
    let preds = model.predict(&probe)?;

    let bounds = model.bounds;
    let predicted = probe
        .iter()
        .zip(&preds)
        .map(|(&x, &y)| PredictionPoint {
            x: bounds.denorm_input(x),
            y: bounds.denorm_label(y),
        })
        .collect();

    let original = samples
        .iter()
        .map(|s| PredictionPoint {
            x: s.horsepower,
            y: s.mpg,
        })
        .collect();

    Ok(Evaluation {
        original,
        predicted,
    })
}
