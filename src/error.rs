
use ndarray_npy::{ReadNpyError, WriteNpyError};
use thiserror::Error;

// every failure aborts the run, there is no retry or fallback anywhere in the crate
#[derive(Debug, Error)]
pub enum EmbeddingError {

    #[error("corpus is not valid UTF-8 text: {0}")]
    Encoding(String),

    #[error("no token appears at least {min_count} times in the training corpus")]
    EmptyCorpus { min_count: usize },

    #[error("unknown model '{0}' in registry")]
    UnknownModel(String),

    #[error("word '{0}' is not in the model vocabulary")]
    WordNotFound(String),

    #[error("unknown catalog category '{0}'")]
    UnknownCategory(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("malformed artifact '{name}': {reason}")]
    MalformedArtifact { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    ReadNpy(#[from] ReadNpyError),

    #[error(transparent)]
    WriteNpy(#[from] WriteNpyError),

    #[error(transparent)]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl EmbeddingError {

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }

    pub fn malformed(name: &str, reason: impl Into<String>) -> Self {
        Self::MalformedArtifact { name: name.to_owned(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;
