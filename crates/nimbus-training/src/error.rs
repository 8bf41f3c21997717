use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid training run config: {0}")]
    InvalidConfig(String),

    #[error("batch source error: {0}")]
    Source(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("batch source has {available} batches, at least {required} are required")]
    InsufficientBatches { required: usize, available: usize },

    #[error("plot error: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainingError {
    pub(crate) fn plot(err: impl std::fmt::Display) -> Self {
        Self::Plot(err.to_string())
    }
}
