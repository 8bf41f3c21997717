//! Nimbus Training
//!
//! Training-run orchestration for cloud-base-height regressors:
//! - Configuring a run (`TrainingRunConfig`) and its on-disk layout (`RunLayout`)
//! - Driving the epoch loop over batch sources (`fit`, `Orchestrator`)
//! - Lifecycle hooks: checkpoints, metrics log, LR plateau, CSV log
//! - Rendering prediction-vs-truth plots (`visualize`)

pub mod config;
pub mod dataset;
pub mod error;
pub mod fit;
pub mod hooks;
pub mod layout;
pub mod loader;
pub mod model;
pub mod rescale;
pub mod trainer;
pub mod visualize;

#[cfg(test)]
mod testing;

pub use config::{
    CheckpointSettings, LrPlateauSettings, MetricsLogSettings, RunId, TrainingRunConfig, UpdateFreq,
    VisualizationSettings,
};
pub use dataset::{Batch, BatchSource, InMemorySource, Inputs};
pub use error::{TrainingError, TrainingResult};
pub use fit::{evaluate, fit, FitOptions, History};
pub use hooks::{EpochLogs, Hook, HookKind, HookList};
pub use layout::RunLayout;
pub use model::{predict, Model};
pub use rescale::{rescale, Rescaler};
pub use trainer::Orchestrator;
pub use visualize::{assemble_evaluation_batch, plot_prediction, EvaluationBatch, SeriesStats, EVAL_BATCHES};
