//! Training lifecycle hooks.
//!
//! A [`HookList`] is an explicit ordered list handed to the fit routine.
//! Every hook receives every event, in list order, so a hook may read log
//! entries written by the hooks before it.

pub mod checkpoint;
pub mod csv_logger;
pub mod lr_plateau;
pub mod metrics_log;
pub mod visualization;

use crate::error::TrainingResult;
use crate::model::Model;
use std::collections::BTreeMap;

pub use checkpoint::CheckpointHook;
pub use csv_logger::CsvLoggerHook;
pub use lr_plateau::LrPlateauHook;
pub use metrics_log::MetricsLogHook;
pub use visualization::VisualizationHook;

/// Metric name to value for one epoch (`loss`, `val_loss`, `lr`, ...).
pub type EpochLogs = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Checkpoint,
    MetricsLog,
    LrReduction,
    CsvLogger,
    Visualization,
    /// Caller-supplied hook, identified by name.
    Custom(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct TrainContext {
    pub epochs: usize,
    pub steps_per_epoch: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchContext {
    pub epoch: usize,
    /// Position of the batch within the epoch.
    pub step: usize,
    pub global_step: usize,
    pub size: usize,
    pub loss: f64,
}

pub trait Hook: Send {
    fn kind(&self) -> HookKind;

    fn on_train_begin(&mut self, _ctx: &TrainContext) -> TrainingResult<()> {
        Ok(())
    }

    fn on_batch_end(&mut self, _ctx: &BatchContext) -> TrainingResult<()> {
        Ok(())
    }

    fn on_epoch_end(&mut self, _epoch: usize, _logs: &mut EpochLogs, _model: &mut dyn Model) -> TrainingResult<()> {
        Ok(())
    }

    fn on_train_end(&mut self) -> TrainingResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct HookList {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<HookKind> {
        self.hooks.iter().map(|h| h.kind()).collect()
    }

    pub fn on_train_begin(&mut self, ctx: &TrainContext) -> TrainingResult<()> {
        self.hooks.iter_mut().try_for_each(|h| h.on_train_begin(ctx))
    }

    pub fn on_batch_end(&mut self, ctx: &BatchContext) -> TrainingResult<()> {
        self.hooks.iter_mut().try_for_each(|h| h.on_batch_end(ctx))
    }

    pub fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, model: &mut dyn Model) -> TrainingResult<()> {
        for hook in &mut self.hooks {
            hook.on_epoch_end(epoch, logs, model)?;
        }
        Ok(())
    }

    pub fn on_train_end(&mut self) -> TrainingResult<()> {
        self.hooks.iter_mut().try_for_each(|h| h.on_train_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubModel;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        kind: HookKind,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Hook for Recorder {
        fn kind(&self) -> HookKind {
            self.kind
        }

        fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, _model: &mut dyn Model) -> TrainingResult<()> {
            self.seen.lock().unwrap().push(format!("{:?}@{epoch}:{}", self.kind, logs.len()));
            logs.insert(format!("{:?}", self.kind), 1.0);
            Ok(())
        }
    }

    #[test]
    fn test_hooks_run_in_list_order_and_share_logs() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookList::new();
        hooks.push(Recorder { kind: HookKind::LrReduction, seen: Arc::clone(&seen) });
        hooks.push(Recorder { kind: HookKind::CsvLogger, seen: Arc::clone(&seen) });
        hooks.push(Recorder { kind: HookKind::Custom("audit"), seen: Arc::clone(&seen) });

        let mut model = StubModel::new(0.01);
        let mut logs = EpochLogs::new();
        hooks.on_epoch_end(2, &mut logs, &mut model).unwrap();

        assert_eq!(hooks.kinds(), vec![HookKind::LrReduction, HookKind::CsvLogger, HookKind::Custom("audit")]);
        assert_eq!(*seen.lock().unwrap(), vec!["LrReduction@2:0", "CsvLogger@2:1", "Custom(\"audit\")@2:2"]);
    }
}
