use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire network core.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The network core's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyDataset,
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => {
                write!(f, "size mismatch in {what}: got {got}, expected {expected}")
            }
            MlErr::EmptyDataset => write!(f, "the dataset has no samples"),
        }
    }
}

impl Error for MlErr {}
