use super::{EpochLogs, Hook, HookKind, TrainContext};
use crate::error::TrainingResult;
use crate::model::Model;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

/// Streams per-epoch metrics to a CSV file.
///
/// The header is fixed from the metric keys of the first epoch, sorted;
/// later epochs lacking one of those keys get `NA`.
pub struct CsvLoggerHook {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    keys: Option<Vec<String>>,
}

impl CsvLoggerHook {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, writer: None, keys: None }
    }
}

impl Hook for CsvLoggerHook {
    fn kind(&self) -> HookKind {
        HookKind::CsvLogger
    }

    fn on_train_begin(&mut self, _ctx: &TrainContext) -> TrainingResult<()> {
        debug!(path = %self.path.display(), "opening csv log");
        self.writer = Some(csv::Writer::from_path(&self.path)?);
        self.keys = None;
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &mut EpochLogs, _model: &mut dyn Model) -> TrainingResult<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => csv::Writer::from_path(&self.path)?,
        };
        let writer = self.writer.insert(writer);

        if self.keys.is_none() {
            let keys: Vec<String> = logs.keys().cloned().collect();
            let mut header = vec!["epoch".to_string()];
            header.extend(keys.iter().cloned());
            writer.write_record(&header)?;
            self.keys = Some(keys);
        }
        let keys = self.keys.as_deref().unwrap_or_default();

        let mut row = vec![epoch.to_string()];
        row.extend(keys.iter().map(|k| logs.get(k).map_or_else(|| "NA".to_string(), |v| v.to_string())));
        writer.write_record(&row)?;
        writer.flush()?;
        Ok(())
    }

    fn on_train_end(&mut self) -> TrainingResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
