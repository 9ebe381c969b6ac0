use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Shape mismatch: tensor has {elements} elements but data length is {len}")]
    ShapeDataMismatch {
        shape: Vec<usize>,
        elements: usize,
        len: usize,
    },

    #[error("{op}: expected shape {expected}, got {actual:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: String,
        actual: Vec<usize>,
    },

    #[error("Cannot broadcast shapes {0:?} and {1:?}")]
    BroadcastError(Vec<usize>, Vec<usize>),

    #[error("{module} takes {expected} input(s), got {got}")]
    Arity {
        module: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{0} has no forward computation of its own")]
    NoForward(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape(op: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Error::ShapeMismatch {
            op,
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }
}
