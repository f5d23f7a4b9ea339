use std::sync::Arc;

use parking_lot::Mutex;

use crate::session::TrainedModel;

/// Single-writer handle to the process-wide trained model.
///
/// There is exactly one live trained model at a time; it is replaced
/// wholesale on retrain and never partially mutated. Readers clone the `Arc`
/// out, so a concurrent replace can never hand anyone a half-written model.
#[derive(Debug, Default)]
pub struct ModelSlot {
    inner: Mutex<Option<Arc<TrainedModel>>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held model.
    pub fn store(&self, model: Arc<TrainedModel>) {
        *self.inner.lock() = Some(model);
    }

    /// Returns the held model, if any training run has completed.
    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        self.inner.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ModelConfig, normalize::Bounds};

    fn model(w: f32) -> Arc<TrainedModel> {
        let config = ModelConfig {
            layers: vec![crate::config::LayerConfig::Dense {
                dim: (1, 1),
                act_fn: None,
            }],
        };
        let net = config.build().unwrap();
        Arc::new(TrainedModel {
            config,
            net,
            params: vec![w, 0.0],
            bounds: Bounds {
                input_min: 0.0,
                input_max: 1.0,
                label_min: 0.0,
                label_max: 1.0,
            },
        })
    }

    #[test]
    fn replaces_wholesale() {
        let slot = ModelSlot::new();
        assert!(slot.is_empty());
        assert!(slot.current().is_none());

        slot.store(model(1.0));
        assert_eq!(slot.current().unwrap().params[0], 1.0);

        slot.store(model(2.0));
        assert_eq!(slot.current().unwrap().params[0], 2.0);
    }
}
