use std::time::{Duration, Instant};

/// High-level lifecycle states for the run pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Training,
    Evaluated,
    Failed,
}

/// A single log entry shown in the event panel.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: &'static str,
    pub message: String,
}

/// A modal popup, shown until any key dismisses it.
#[derive(Debug, Clone)]
pub struct DialogView {
    pub title: String,
    pub text: String,
    pub error: bool,
}

/// Per-layer dimensions of the built model.
#[derive(Debug, Clone)]
pub struct SummaryView {
    pub layers: Vec<(usize, usize)>,
    pub num_params: usize,
}

/// Full snapshot rendered by the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub phase: Phase,
    pub started_at: Instant,
    pub elapsed: Duration,
    pub epochs_done: usize,
    pub epochs_total: usize,

    /// (epoch, value) series for the progress chart.
    pub losses: Vec<(f64, f64)>,
    pub mses: Vec<(f64, f64)>,

    /// (horsepower, mpg) scatter of the loaded working set.
    pub data_points: Vec<(f64, f64)>,
    pub summary: Option<SummaryView>,

    /// Evaluation series in original units.
    pub original: Vec<(f64, f64)>,
    pub predicted: Vec<(f64, f64)>,

    pub logs: Vec<LogLine>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            started_at: Instant::now(),
            elapsed: Duration::default(),
            epochs_done: 0,
            epochs_total: 0,
            losses: Vec::new(),
            mses: Vec::new(),
            data_points: Vec::new(),
            summary: None,
            original: Vec::new(),
            predicted: Vec::new(),
            logs: Vec::new(),
        }
    }
}
