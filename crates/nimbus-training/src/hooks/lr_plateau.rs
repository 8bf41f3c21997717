use super::{EpochLogs, Hook, HookKind};
use crate::config::LrPlateauSettings;
use crate::error::TrainingResult;
use crate::model::Model;
use tracing::{info, warn};

/// Reduces the model's learning rate once the monitored metric stops improving.
pub struct LrPlateauHook {
    settings: LrPlateauSettings,
    best: f64,
    wait: usize,
    cooldown_counter: usize,
}

impl LrPlateauHook {
    #[must_use]
    pub fn new(settings: LrPlateauSettings) -> Self {
        Self { settings, best: f64::INFINITY, wait: 0, cooldown_counter: 0 }
    }

    fn in_cooldown(&self) -> bool {
        self.cooldown_counter > 0
    }
}

impl Hook for LrPlateauHook {
    fn kind(&self) -> HookKind {
        HookKind::LrReduction
    }

    fn on_train_begin(&mut self, _ctx: &super::TrainContext) -> TrainingResult<()> {
        self.best = f64::INFINITY;
        self.wait = 0;
        self.cooldown_counter = 0;
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, model: &mut dyn Model) -> TrainingResult<()> {
        logs.insert("lr".to_string(), model.learning_rate());

        let Some(&current) = logs.get(&self.settings.monitor) else {
            warn!(monitor = %self.settings.monitor, epoch, "monitored metric unavailable, learning rate unchanged");
            return Ok(());
        };

        if self.in_cooldown() {
            self.cooldown_counter -= 1;
            self.wait = 0;
        }

        if current < self.best - self.settings.min_delta {
            self.best = current;
            self.wait = 0;
        } else if !self.in_cooldown() {
            self.wait += 1;
            if self.wait >= self.settings.patience {
                let old_lr = model.learning_rate();
                if old_lr > self.settings.min_lr {
                    let new_lr = (old_lr * self.settings.factor).max(self.settings.min_lr);
                    model.set_learning_rate(new_lr);
                    info!(epoch, old_lr, new_lr, "reducing learning rate on plateau");
                }
                self.cooldown_counter = self.settings.cooldown;
                self.wait = 0;
            }
        }
        Ok(())
    }
}
