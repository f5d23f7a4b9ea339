use std::{
    fs,
    path::{Path, PathBuf},
};

use ml::arch::Sequential;
use safetensors::{tensor::TensorView, Dtype, SafeTensors};
use serde::{Deserialize, Serialize};

use crate::{
    config::{ActFnConfig, LayerConfig, ModelConfig},
    error::{PipelineErr, Result},
    session::{predict_column, TrainedModel},
    slot::ModelSlot,
};

/// Base name of the persisted artifact pair.
pub const MODEL_BASE_NAME: &str = "mpg-net";

/// How many probe points the post-load smoke inference runs.
pub const SMOKE_POINTS: usize = 10;

/// The topology manifest persisted next to the weights blob.
///
/// Normalization bounds are deliberately not part of the artifact; a loaded
/// model predicts in normalized space only, like the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub layers: Vec<LayerManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerManifest {
    pub inputs: usize,
    pub outputs: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<String>,
}

/// A model rebuilt from a manifest/weights pair.
///
/// Distinct from the training-run singleton: loading never touches the
/// [`ModelSlot`].
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub config: ModelConfig,
    pub net: Sequential,
    pub params: Vec<f32>,
}

impl LoadedModel {
    /// Runs inference over a column of normalized inputs.
    pub fn predict(&self, xs: &[f32]) -> Result<Vec<f32>> {
        predict_column(&self.net, &self.params, xs)
    }
}

/// Serializes the model currently held by the slot.
///
/// # Returns
/// The manifest and weights paths written, or `NoModel` if no training run
/// has completed yet.
pub fn save_current(slot: &ModelSlot, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let model = slot.current().ok_or(PipelineErr::NoModel)?;
    save(&model, dir)
}

/// Serializes a trained model as `<dir>/mpg-net.json` plus
/// `<dir>/mpg-net.safetensors`.
///
/// # Arguments
/// * `model` - The model to persist.
/// * `dir` - The directory receiving both artifacts.
///
/// # Returns
/// The manifest and weights paths written.
pub fn save(model: &TrainedModel, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let manifest_path = dir.join(format!("{MODEL_BASE_NAME}.json"));
    let weights_path = dir.join(format!("{MODEL_BASE_NAME}.safetensors"));

    let manifest = manifest_of(&model.config);
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;

    let mut tensors: Vec<(String, TensorView)> = Vec::new();
    let mut offset = 0;
    for (i, layer) in model.net.layers().iter().enumerate() {
        let (n, m) = layer.dim();
        let weights = &model.params[offset..offset + n * m];
        let biases = &model.params[offset + n * m..offset + layer.size()];

        tensors.push((
            format!("dense_{i}.weight"),
            TensorView::new(Dtype::F32, vec![n, m], bytemuck::cast_slice(weights))
                .map_err(|e| PipelineErr::InvalidModelFile(e.to_string()))?,
        ));
        tensors.push((
            format!("dense_{i}.bias"),
            TensorView::new(Dtype::F32, vec![m], bytemuck::cast_slice(biases))
                .map_err(|e| PipelineErr::InvalidModelFile(e.to_string()))?,
        ));

        offset += layer.size();
    }

    let blob = safetensors::serialize(tensors, &None)
        .map_err(|e| PipelineErr::InvalidModelFile(e.to_string()))?;
    fs::write(&weights_path, blob)?;

    log::info!(
        "saved model to {} and {}",
        manifest_path.display(),
        weights_path.display()
    );

    Ok((manifest_path, weights_path))
}

/// Deserializes a manifest/weights pair and runs the smoke inference.
///
/// Every tensor named by the manifest must exist in the blob with the dtype
/// and shape the manifest implies; anything else is `InvalidModelFile`.
///
/// # Arguments
/// * `manifest_path` - The topology manifest.
/// * `weights_path` - The safetensors blob.
///
/// # Returns
/// The rebuilt model and the raw (non-denormalized) predictions of a
/// 10-point [0, 1] probe.
pub fn load(manifest_path: &Path, weights_path: &Path) -> Result<(LoadedModel, Vec<f32>)> {
    let manifest_raw = fs::read_to_string(manifest_path)?;
    let manifest: Manifest = serde_json::from_str(&manifest_raw)
        .map_err(|e| PipelineErr::InvalidModelFile(format!("manifest: {e}")))?;

    let config = config_of(&manifest)?;
    let net = config.build()?;

    let blob = fs::read(weights_path)?;
    let st = SafeTensors::deserialize(&blob)
        .map_err(|e| PipelineErr::InvalidModelFile(format!("weights: {e}")))?;

    let mut params = vec![0.0f32; net.num_params()];
    let mut offset = 0;
    for (i, layer) in net.layers().iter().enumerate() {
        let (n, m) = layer.dim();
        copy_tensor(
            &st,
            &format!("dense_{i}.weight"),
            &[n, m],
            &mut params[offset..offset + n * m],
        )?;
        copy_tensor(
            &st,
            &format!("dense_{i}.bias"),
            &[m],
            &mut params[offset + n * m..offset + layer.size()],
        )?;
        offset += layer.size();
    }

    let model = LoadedModel {
        config,
        net,
        params,
    };

    let probe: Vec<f32> = (0..SMOKE_POINTS)
        .map(|i| i as f32 / (SMOKE_POINTS - 1) as f32)
        .collect();
    let preds = model.predict(&probe)?;

    log::info!("loaded model from {}", manifest_path.display());

    Ok((model, preds))
}

fn copy_tensor(st: &SafeTensors, name: &str, shape: &[usize], out: &mut [f32]) -> Result<()> {
    let view = st
        .tensor(name)
        .map_err(|e| PipelineErr::InvalidModelFile(format!("{name}: {e}")))?;

    if view.dtype() != Dtype::F32 {
        return Err(PipelineErr::InvalidModelFile(format!(
            "{name}: expected f32, got {:?}",
            view.dtype()
        )));
    }
    if view.shape() != shape {
        return Err(PipelineErr::InvalidModelFile(format!(
            "{name}: shape {:?} does not match the manifest ({shape:?})",
            view.shape()
        )));
    }

    // The blob carries no alignment guarantee, so decode chunk by chunk.
    for (dst, src) in out.iter_mut().zip(view.data().chunks_exact(4)) {
        *dst = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    }

    Ok(())
}

fn manifest_of(config: &ModelConfig) -> Manifest {
    let layers = config
        .layers
        .iter()
        .map(|layer| match *layer {
            LayerConfig::Dense { dim, act_fn } => LayerManifest {
                inputs: dim.0,
                outputs: dim.1,
                activation: act_fn.map(|a| {
                    match a {
                        ActFnConfig::Relu => "relu",
                        ActFnConfig::Sigmoid => "sigmoid",
                    }
                    .to_string()
                }),
            },
        })
        .collect();

    Manifest {
        name: MODEL_BASE_NAME.to_string(),
        layers,
    }
}

fn config_of(manifest: &Manifest) -> Result<ModelConfig> {
    let layers = manifest
        .layers
        .iter()
        .map(|layer| {
            let act_fn = match layer.activation.as_deref() {
                None => None,
                Some("relu") => Some(ActFnConfig::Relu),
                Some("sigmoid") => Some(ActFnConfig::Sigmoid),
                Some(other) => {
                    return Err(PipelineErr::InvalidModelFile(format!(
                        "unknown activation: {other}"
                    )))
                }
            };
            Ok(LayerConfig::Dense {
                dim: (layer.inputs, layer.outputs),
                act_fn,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelConfig { layers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Bounds;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mpg-net-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn trained_fixture() -> TrainedModel {
        let config = ModelConfig::mpg_net();
        let net = config.build().unwrap();
        let params: Vec<f32> = (0..net.num_params())
            .map(|i| (i as f32 * 0.37).sin() * 0.5)
            .collect();

        TrainedModel {
            config,
            net,
            params,
            bounds: Bounds {
                input_min: 46.0,
                input_max: 230.0,
                label_min: 9.0,
                label_max: 46.6,
            },
        }
    }

    #[test]
    fn save_then_load_reproduces_the_probe() {
        let dir = scratch_dir("roundtrip");
        let model = trained_fixture();

        let (manifest_path, weights_path) = save(&model, &dir).unwrap();
        let (loaded, preds) = load(&manifest_path, &weights_path).unwrap();

        assert_eq!(preds.len(), SMOKE_POINTS);
        assert_eq!(loaded.config, model.config);

        let probe: Vec<f32> = (0..SMOKE_POINTS)
            .map(|i| i as f32 / (SMOKE_POINTS - 1) as f32)
            .collect();
        let expected = model.predict(&probe).unwrap();
        for (a, b) in preds.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn mismatched_manifest_is_rejected() {
        let dir = scratch_dir("mismatch");
        let model = trained_fixture();
        let (manifest_path, weights_path) = save(&model, &dir).unwrap();

        // Rewrite the manifest so the first layer no longer matches the blob.
        let mut manifest: Manifest =
            serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
        manifest.layers[0].outputs = 4;
        manifest.layers[1].inputs = 4;
        fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

        let err = load(&manifest_path, &weights_path).unwrap_err();
        assert!(matches!(err, PipelineErr::InvalidModelFile(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn garbage_manifest_is_rejected() {
        let dir = scratch_dir("garbage");
        let manifest_path = dir.join("mpg-net.json");
        let weights_path = dir.join("mpg-net.safetensors");
        fs::write(&manifest_path, b"{ not json").unwrap();
        fs::write(&weights_path, b"not safetensors").unwrap();

        let err = load(&manifest_path, &weights_path).unwrap_err();
        assert!(matches!(err, PipelineErr::InvalidModelFile(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_without_a_trained_model_is_no_model() {
        let slot = ModelSlot::new();
        let err = save_current(&slot, &std::env::temp_dir()).unwrap_err();
        assert!(matches!(err, PipelineErr::NoModel));
    }
}
