use super::{EpochLogs, Hook, HookKind};
use crate::config::CheckpointSettings;
use crate::error::TrainingResult;
use crate::layout::RunLayout;
use crate::model::Model;
use tracing::{info, warn};

/// Writes a full model snapshot at the end of each epoch.
pub struct CheckpointHook {
    layout: RunLayout,
    settings: CheckpointSettings,
    best: Option<f64>,
}

impl CheckpointHook {
    #[must_use]
    pub fn new(layout: RunLayout, settings: CheckpointSettings) -> Self {
        Self { layout, settings, best: None }
    }

    fn should_save(&mut self, epoch: usize, logs: &EpochLogs) -> bool {
        if !self.settings.save_best_only {
            return true;
        }
        let Some(&current) = logs.get(&self.settings.monitor) else {
            warn!(monitor = %self.settings.monitor, epoch, "monitored metric unavailable, skipping checkpoint");
            return false;
        };
        if self.best.is_none_or(|best| current < best) {
            self.best = Some(current);
            true
        } else {
            false
        }
    }
}

impl Hook for CheckpointHook {
    fn kind(&self) -> HookKind {
        HookKind::Checkpoint
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, model: &mut dyn Model) -> TrainingResult<()> {
        if !self.should_save(epoch, logs) {
            return Ok(());
        }
        let path = self.layout.checkpoint_path(epoch);
        info!(epoch, path = %path.display(), "saving model checkpoint");
        model.save(&path)
    }
}
