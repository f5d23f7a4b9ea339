use std::{path::PathBuf, time::Instant};

use pipeline::{PipelineEvent, TrainingEvent};
use tokio::sync::mpsc;

use super::model::{DashboardView, DialogView, LogLine, Phase, SummaryView};

const MAX_LOGS: usize = 200;

/// Everything the background tasks report back to the UI.
#[derive(Debug)]
pub enum UiEvent {
    Pipeline(PipelineEvent),
    RunFinished,
    RunFailed(String),
    LoadDone { predictions: Vec<f32> },
    LoadFailed(String),
    SaveDone { manifest: PathBuf, weights: PathBuf },
    SaveFailed(String),
}

/// Drives the UI state from the stream of [`UiEvent`]s.
pub struct SessionState {
    view: DashboardView,
    events: mpsc::Receiver<UiEvent>,
    dialog: Option<DialogView>,
    busy: bool,
}

impl SessionState {
    /// Creates a new idle `SessionState`.
    ///
    /// # Arguments
    /// * `events` - The receiver end of the UI events channel.
    pub fn new(events: mpsc::Receiver<UiEvent>) -> Self {
        Self {
            view: DashboardView::new(),
            events,
            dialog: None,
            busy: false,
        }
    }

    /// Returns the current snapshot for rendering.
    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn dialog(&self) -> Option<&DialogView> {
        self.dialog.as_ref()
    }

    /// Whether a run, load, or save is currently in flight. At most one
    /// action runs at a time.
    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn dismiss_dialog(&mut self) {
        self.dialog = None;
    }

    /// Resets the dashboard for a fresh run.
    pub fn begin_run(&mut self, epochs_total: usize) {
        self.view = DashboardView::new();
        self.view.phase = Phase::Fetching;
        self.view.started_at = Instant::now();
        self.view.epochs_total = epochs_total;
        self.busy = true;
        self.push_log("INFO", "fetching dataset...".into());
    }

    /// Marks a load or save action as in flight.
    pub fn begin_action(&mut self) {
        self.busy = true;
    }

    pub fn show_error(&mut self, title: &str, text: String) {
        self.dialog = Some(DialogView {
            title: title.into(),
            text,
            error: true,
        });
    }

    /// Drains all pending events and updates state. Non-blocking; called
    /// once per frame tick.
    pub fn tick(&mut self) {
        self.view.elapsed = self.view.started_at.elapsed();

        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Pipeline(event) => self.apply_pipeline(event),

            UiEvent::RunFinished => {
                self.busy = false;
                self.push_log("INFO", "run complete".into());
            }

            UiEvent::RunFailed(msg) => {
                self.busy = false;
                self.view.phase = Phase::Failed;
                self.push_log("ERROR", msg.clone());
                self.show_error("Run failed", msg);
            }

            UiEvent::LoadDone { predictions } => {
                self.busy = false;
                let joined = predictions
                    .iter()
                    .map(|p| format!("{p:.3}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.push_log("INFO", format!("model loaded, smoke probe: [{joined}]"));
                self.dialog = Some(DialogView {
                    title: "Model uploaded".into(),
                    text: format!("Model successfully loaded! Predicted: {joined}"),
                    error: false,
                });
            }

            UiEvent::LoadFailed(msg) => {
                self.busy = false;
                self.push_log("ERROR", msg.clone());
                self.show_error("Load failed", msg);
            }

            UiEvent::SaveDone { manifest, weights } => {
                self.busy = false;
                self.push_log("INFO", format!("model saved to {}", manifest.display()));
                self.dialog = Some(DialogView {
                    title: "Model saved".into(),
                    text: format!("{}\n{}", manifest.display(), weights.display()),
                    error: false,
                });
            }

            UiEvent::SaveFailed(msg) => {
                self.busy = false;
                self.push_log("ERROR", msg.clone());
                self.show_error("Save failed", msg);
            }
        }
    }

    fn apply_pipeline(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::DataLoaded { samples } => {
                self.view.data_points = samples
                    .iter()
                    .map(|s| (s.horsepower as f64, s.mpg as f64))
                    .collect();
                self.push_log("INFO", format!("loaded {} usable samples", samples.len()));
            }

            PipelineEvent::ModelSummary { layers, num_params } => {
                self.push_log("INFO", format!("model built: {num_params} parameters"));
                self.view.summary = Some(SummaryView { layers, num_params });
            }

            PipelineEvent::Training(TrainingEvent::Epoch { epoch, loss, mse }) => {
                self.view.phase = Phase::Training;
                self.view.epochs_done = epoch;
                self.view.losses.push((epoch as f64, loss as f64));
                self.view.mses.push((epoch as f64, mse as f64));
                self.push_log("INFO", format!("epoch {epoch}: loss={loss:.5} mse={mse:.5}"));
            }

            PipelineEvent::Training(TrainingEvent::Complete { epochs }) => {
                self.push_log("INFO", format!("training complete after {epochs} epochs"));
            }

            PipelineEvent::EvaluationReady(evaluation) => {
                self.view.phase = Phase::Evaluated;
                self.view.original = evaluation
                    .original
                    .iter()
                    .map(|p| (p.x as f64, p.y as f64))
                    .collect();
                self.view.predicted = evaluation
                    .predicted
                    .iter()
                    .map(|p| (p.x as f64, p.y as f64))
                    .collect();
                self.push_log("INFO", "evaluation ready".into());
            }
        }
    }

    fn push_log(&mut self, level: &'static str, message: String) {
        self.view.logs.push(LogLine { level, message });
        if self.view.logs.len() > MAX_LOGS {
            let drain = self.view.logs.len() - MAX_LOGS;
            self.view.logs.drain(0..drain);
        }
    }
}
