//! Generator-driven training loop.

use crate::dataset::BatchSource;
use crate::error::{TrainingError, TrainingResult};
use crate::hooks::{BatchContext, EpochLogs, HookList, TrainContext};
use crate::loader::{batch_stream, BatchOrder};
use crate::model::Model;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs: usize,
    /// Concurrent batch fetches; `0` loads on the training task.
    pub workers: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

/// Per-epoch logs recorded by [`fit`].
#[derive(Debug, Clone, Default)]
pub struct History {
    pub epochs: Vec<EpochLogs>,
}

impl History {
    #[must_use]
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&EpochLogs> {
        self.epochs.last()
    }

    /// Values of `name` across epochs, skipping epochs where it is absent.
    #[must_use]
    pub fn metric(&self, name: &str) -> Vec<f64> {
        self.epochs.iter().filter_map(|logs| logs.get(name).copied()).collect()
    }
}

/// Sample-weighted running mean of batch losses.
#[derive(Debug, Default)]
struct MeanLoss {
    total: f64,
    samples: usize,
}

impl MeanLoss {
    fn add(&mut self, loss: f64, samples: usize) {
        self.total += loss * samples as f64;
        self.samples += samples;
    }

    fn value(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.total / self.samples as f64)
    }
}

/// Train `model` for `options.epochs` epochs over `train`, evaluating on
/// `valid` after every epoch and dispatching `hooks` in list order.
pub async fn fit(
    model: &mut dyn Model,
    train: Arc<dyn BatchSource>,
    valid: Option<Arc<dyn BatchSource>>,
    options: &FitOptions,
    hooks: &mut HookList,
) -> TrainingResult<History> {
    let steps_per_epoch = train.len();
    if steps_per_epoch == 0 {
        return Err(TrainingError::Source("training source yielded no batches".to_string()));
    }

    let mut order = BatchOrder::new(steps_per_epoch, options.shuffle, options.seed);
    let mut history = History::default();
    let mut global_step = 0;

    hooks.on_train_begin(&TrainContext { epochs: options.epochs, steps_per_epoch })?;

    for epoch in 0..options.epochs {
        let mut train_loss = MeanLoss::default();
        let mut batches = batch_stream(Arc::clone(&train), order.next_epoch(), options.workers);
        let mut step = 0;
        while let Some(batch) = batches.next().await {
            let batch = batch?;
            batch.validate()?;
            let loss = model.train_on_batch(&batch)?;
            train_loss.add(loss, batch.len());
            hooks.on_batch_end(&BatchContext { epoch, step, global_step, size: batch.len(), loss })?;
            step += 1;
            global_step += 1;
        }

        let mut logs = EpochLogs::new();
        if let Some(loss) = train_loss.value() {
            logs.insert("loss".to_string(), loss);
        }
        if let Some(valid) = &valid {
            if let Some(val_loss) = evaluate(model, Arc::clone(valid), options.workers).await? {
                logs.insert("val_loss".to_string(), val_loss);
            }
        }
        train.on_epoch_end();

        hooks.on_epoch_end(epoch, &mut logs, model)?;
        info!(epoch, epochs = options.epochs, logs = ?logs, "epoch finished");
        history.epochs.push(logs);
    }

    hooks.on_train_end()?;
    Ok(history)
}

/// Sample-weighted mean loss over every batch of `source`, in order.
pub async fn evaluate(model: &dyn Model, source: Arc<dyn BatchSource>, workers: usize) -> TrainingResult<Option<f64>> {
    let order: Vec<usize> = (0..source.len()).collect();
    let mut batches = batch_stream(source, order, workers);
    let mut mean = MeanLoss::default();
    while let Some(batch) = batches.next().await {
        let batch = batch?;
        batch.validate()?;
        mean.add(model.test_on_batch(&batch)?, batch.len());
    }
    debug!(val_loss = ?mean.value(), "validation pass finished");
    Ok(mean.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemorySource;
    use crate::hooks::{Hook, HookKind};
    use crate::testing::{sample_batch, StubModel};
    use std::sync::Mutex;

    fn source(batches: usize, batch_size: usize) -> Arc<dyn BatchSource> {
        Arc::new(InMemorySource::new((0..batches).map(|i| sample_batch(batch_size, i as f32 * 0.1)).collect()))
    }

    #[derive(Default)]
    struct Events(Arc<Mutex<Vec<String>>>);

    impl Hook for Events {
        fn kind(&self) -> HookKind {
            HookKind::Custom("events")
        }

        fn on_train_begin(&mut self, ctx: &TrainContext) -> TrainingResult<()> {
            self.0.lock().unwrap().push(format!("begin:{}x{}", ctx.epochs, ctx.steps_per_epoch));
            Ok(())
        }

        fn on_batch_end(&mut self, ctx: &BatchContext) -> TrainingResult<()> {
            self.0.lock().unwrap().push(format!("batch:{}:{}:{}", ctx.epoch, ctx.step, ctx.global_step));
            Ok(())
        }

        fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, _model: &mut dyn Model) -> TrainingResult<()> {
            let keys: Vec<_> = logs.keys().cloned().collect();
            self.0.lock().unwrap().push(format!("epoch:{epoch}:{}", keys.join(",")));
            Ok(())
        }

        fn on_train_end(&mut self) -> TrainingResult<()> {
            self.0.lock().unwrap().push("end".to_string());
            Ok(())
        }
    }

    fn options(epochs: usize, workers: usize) -> FitOptions {
        FitOptions { epochs, workers, shuffle: true, seed: Some(1) }
    }

    #[tokio::test]
    async fn test_dispatches_lifecycle_events_in_order() {
        let events = Events::default();
        let seen = Arc::clone(&events.0);
        let mut hooks = HookList::new();
        hooks.push(events);
        let mut model = StubModel::new(0.05);

        let history = fit(&mut model, source(2, 4), Some(source(1, 4)), &options(2, 2), &mut hooks).await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "begin:2x2",
                "batch:0:0:0",
                "batch:0:1:1",
                "epoch:0:loss,val_loss",
                "batch:1:0:2",
                "batch:1:1:3",
                "epoch:1:loss,val_loss",
                "end",
            ]
        );
    }

    #[tokio::test]
    async fn test_training_reduces_loss() {
        let mut model = StubModel::new(0.05);
        let mut hooks = HookList::new();
        let history = fit(&mut model, source(4, 8), None, &options(30, 0), &mut hooks).await.unwrap();

        let losses = history.metric("loss");
        assert_eq!(losses.len(), 30);
        assert!(losses[29] < losses[0], "{losses:?}");
        assert!(history.metric("val_loss").is_empty());
    }

    #[tokio::test]
    async fn test_rejects_empty_training_source() {
        let mut model = StubModel::new(0.05);
        let mut hooks = HookList::new();
        let result = fit(&mut model, source(0, 4), None, &options(1, 1), &mut hooks).await;
        assert!(matches!(result, Err(TrainingError::Source(_))));
    }

    #[tokio::test]
    async fn test_evaluate_weights_by_batch_size() {
        let model = StubModel::new(0.05);
        let batches = vec![sample_batch(2, 0.0), sample_batch(6, 1.0)];
        let expected = (model.test_on_batch(&batches[0]).unwrap() * 2.0
            + model.test_on_batch(&batches[1]).unwrap() * 6.0)
            / 8.0;

        let val = evaluate(&model, Arc::new(InMemorySource::new(batches)), 2).await.unwrap().unwrap();
        assert!((val - expected).abs() < 1e-9);
    }
}
