use crate::config::{RunId, TrainingRunConfig};
use crate::error::TrainingResult;
use std::path::{Path, PathBuf};

/// Filesystem layout for the artifacts of one training run.
///
/// Checkpoints, the CSV log and prediction plots live under
/// `<outpath>/<run_id>/`; the metrics log lives under `<tb_log_root>/<run_id>/`.
#[derive(Debug, Clone)]
pub struct RunLayout {
    run_dir: PathBuf,
    metrics_log_dir: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn new(outpath: &Path, tb_log_root: &Path, run_id: &RunId) -> Self {
        Self {
            run_dir: outpath.join(run_id.as_str()),
            metrics_log_dir: tb_log_root.join(run_id.as_str()),
        }
    }

    #[must_use]
    pub fn for_config(config: &TrainingRunConfig) -> Self {
        Self::new(&config.outpath, &config.tb_log_root, &config.run_id)
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    #[must_use]
    pub fn metrics_log_dir(&self) -> &Path {
        &self.metrics_log_dir
    }

    #[must_use]
    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.run_dir.join(format!("weights-improvement-{epoch:02}.hdf5"))
    }

    #[must_use]
    pub fn csv_log_path(&self) -> PathBuf {
        self.run_dir.join("train_log.csv")
    }

    #[must_use]
    pub fn prediction_plot_path(&self, epoch: usize) -> PathBuf {
        self.run_dir.join(format!("preds_{epoch}.png"))
    }

    #[must_use]
    pub fn metrics_events_path(&self) -> PathBuf {
        self.metrics_log_dir.join("events.jsonl")
    }

    pub fn ensure_run_dirs(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(&self.run_dir)?;
        std::fs::create_dir_all(&self.metrics_log_dir)?;
        Ok(())
    }
}
