use std::{error::Error, fmt, io};

/// The pipeline's result type.
pub type Result<T> = std::result::Result<T, PipelineErr>;

/// All errors that can occur along the run and load/save paths.
#[derive(Debug)]
pub enum PipelineErr {
    /// The dataset fetch did not resolve.
    Http(reqwest::Error),
    /// The dataset payload is not parseable JSON.
    Format(serde_json::Error),
    /// Invalid configuration — caught before any work starts.
    InvalidConfig(String),
    /// A normalization dimension has zero range.
    DegenerateData { what: &'static str, value: f32 },
    /// The epoch loss stopped being finite.
    Diverged { epoch: usize },
    /// The progress receiver went away mid-training.
    Cancelled,
    /// Save was invoked before any training run completed.
    NoModel,
    /// The manifest/weights pair is malformed or mismatched.
    InvalidModelFile(String),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
    /// A network-core error bubbling up.
    Ml(ml::MlErr),
}

impl fmt::Display for PipelineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "dataset fetch failed: {e}"),
            Self::Format(e) => write!(f, "dataset is not valid JSON: {e}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::DegenerateData { what, value } => {
                write!(f, "degenerate data: {what} has zero range (every value is {value})")
            }
            Self::Diverged { epoch } => {
                write!(f, "training diverged at epoch {epoch}: loss is not finite")
            }
            Self::Cancelled => write!(f, "training cancelled: progress receiver dropped"),
            Self::NoModel => write!(f, "no trained model to save; run training first"),
            Self::InvalidModelFile(msg) => write!(f, "invalid model file: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for PipelineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PipelineErr {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<serde_json::Error> for PipelineErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Format(value)
    }
}

impl From<io::Error> for PipelineErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ml::MlErr> for PipelineErr {
    fn from(value: ml::MlErr) -> Self {
        Self::Ml(value)
    }
}
