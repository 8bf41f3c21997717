use crate::config::TrainingRunConfig;
use crate::dataset::BatchSource;
use crate::error::TrainingResult;
use crate::fit::{fit, FitOptions, History};
use crate::hooks::{CheckpointHook, CsvLoggerHook, HookList, LrPlateauHook, MetricsLogHook, VisualizationHook};
use crate::layout::RunLayout;
use crate::model::Model;
use crate::visualize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Configures the hook list for one run and delegates to [`fit`].
pub struct Orchestrator<M> {
    config: TrainingRunConfig,
    layout: RunLayout,
    model: M,
    train: Arc<dyn BatchSource>,
    valid: Arc<dyn BatchSource>,
}

impl<M: Model> Orchestrator<M> {
    pub fn new(
        config: TrainingRunConfig,
        model: M,
        train: Arc<dyn BatchSource>,
        valid: Arc<dyn BatchSource>,
    ) -> TrainingResult<Self> {
        config.validate()?;
        let layout = RunLayout::for_config(&config);
        Ok(Self { config, layout, model, train, valid })
    }

    #[must_use]
    pub fn config(&self) -> &TrainingRunConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub fn into_model(self) -> M {
        self.model
    }

    /// Checkpoint, metrics log, learning-rate plateau, CSV logger and, when
    /// enabled, the prediction visualizer, in that order.
    #[must_use]
    pub fn configure_hooks(&self) -> HookList {
        let mut hooks = HookList::new();

        debug!(path = %self.layout.checkpoint_path(0).display(), "checkpoint path for epoch 0");
        hooks.push(CheckpointHook::new(self.layout.clone(), self.config.checkpoint.clone()));

        debug!(dir = %self.layout.metrics_log_dir().display(), "metrics log directory");
        hooks.push(MetricsLogHook::new(self.layout.metrics_events_path(), self.config.metrics_log.update_freq));

        hooks.push(LrPlateauHook::new(self.config.lr_schedule.clone()));
        hooks.push(CsvLoggerHook::new(self.layout.csv_log_path()));

        if self.config.enable_visualization {
            hooks.push(VisualizationHook::new(
                Arc::clone(&self.valid),
                self.config.visualization.clone(),
                self.layout.clone(),
                self.config.batch_size,
            ));
        }
        hooks
    }

    /// Run the training loop to completion. Failures propagate unchanged.
    pub async fn run(&mut self) -> TrainingResult<History> {
        info!(
            run_id = %self.config.run_id,
            run_dir = %self.layout.run_dir().display(),
            epochs = self.config.epochs,
            workers = self.config.workers,
            "starting training run"
        );
        self.layout.ensure_run_dirs()?;

        let mut hooks = self.configure_hooks();
        let options = FitOptions {
            epochs: self.config.epochs,
            workers: self.config.workers,
            shuffle: self.config.shuffle,
            seed: self.config.seed,
        };
        let history = fit(
            &mut self.model,
            Arc::clone(&self.train),
            Some(Arc::clone(&self.valid)),
            &options,
            &mut hooks,
        )
        .await?;

        info!(run_id = %self.config.run_id, epochs = history.len(), "training run finished");
        Ok(history)
    }

    /// Render `preds_<epoch>.png` for the current model outside the training loop.
    pub fn plot_prediction(&self, epoch: usize) -> TrainingResult<PathBuf> {
        std::fs::create_dir_all(self.layout.run_dir())?;
        visualize::plot_prediction(
            &self.model,
            self.valid.as_ref(),
            &self.config.visualization,
            &self.layout,
            self.config.batch_size,
            epoch,
        )
    }
}
