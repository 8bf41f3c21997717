use super::{BatchContext, EpochLogs, Hook, HookKind, TrainContext};
use crate::config::UpdateFreq;
use crate::error::TrainingResult;
use crate::model::Model;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// One scalar sample in the metrics event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    pub wall_time: f64,
    pub step: u64,
    pub tag: String,
    pub value: f64,
}

/// Writes scalar events (`events.jsonl`) to the run's metrics log directory.
/// Each training run starts the file afresh.
pub struct MetricsLogHook {
    path: PathBuf,
    update_freq: UpdateFreq,
    writer: Option<BufWriter<File>>,
}

impl MetricsLogHook {
    #[must_use]
    pub fn new(path: PathBuf, update_freq: UpdateFreq) -> Self {
        Self { path, update_freq, writer: None }
    }

    fn write_scalar(&mut self, step: u64, tag: String, value: f64) -> TrainingResult<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.open(false)?,
        };
        let writer = self.writer.insert(writer);

        let event = ScalarEvent { wall_time: wall_time(), step, tag, value };
        serde_json::to_writer(&mut *writer, &event)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn open(&self, truncate: bool) -> TrainingResult<BufWriter<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.create(true).open(&self.path)?;
        Ok(BufWriter::new(file))
    }

    fn flush(&mut self) -> TrainingResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

fn wall_time() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

impl Hook for MetricsLogHook {
    fn kind(&self) -> HookKind {
        HookKind::MetricsLog
    }

    fn on_train_begin(&mut self, ctx: &TrainContext) -> TrainingResult<()> {
        debug!(path = %self.path.display(), epochs = ctx.epochs, "opening metrics log");
        self.writer = Some(self.open(true)?);
        Ok(())
    }

    fn on_batch_end(&mut self, ctx: &BatchContext) -> TrainingResult<()> {
        if self.update_freq == UpdateFreq::Batch {
            self.write_scalar(ctx.global_step as u64, "batch_loss".to_string(), ctx.loss)?;
        }
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, _model: &mut dyn Model) -> TrainingResult<()> {
        for (name, value) in logs.iter() {
            self.write_scalar(epoch as u64, format!("epoch_{name}"), *value)?;
        }
        self.flush()
    }

    fn on_train_end(&mut self) -> TrainingResult<()> {
        self.flush()?;
        self.writer = None;
        Ok(())
    }
}
