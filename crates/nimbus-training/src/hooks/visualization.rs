use super::{EpochLogs, Hook, HookKind};
use crate::config::VisualizationSettings;
use crate::dataset::BatchSource;
use crate::error::TrainingResult;
use crate::layout::RunLayout;
use crate::model::Model;
use crate::visualize;
use std::sync::Arc;

/// Renders the prediction plot for the validation sample at every epoch end.
pub struct VisualizationHook {
    source: Arc<dyn BatchSource>,
    settings: VisualizationSettings,
    layout: RunLayout,
    batch_size: usize,
}

impl VisualizationHook {
    #[must_use]
    pub fn new(
        source: Arc<dyn BatchSource>,
        settings: VisualizationSettings,
        layout: RunLayout,
        batch_size: usize,
    ) -> Self {
        Self { source, settings, layout, batch_size }
    }
}

impl Hook for VisualizationHook {
    fn kind(&self) -> HookKind {
        HookKind::Visualization
    }

    fn on_epoch_end(&mut self, epoch: usize, _logs: &mut EpochLogs, model: &mut dyn Model) -> TrainingResult<()> {
        visualize::plot_prediction(&*model, self.source.as_ref(), &self.settings, &self.layout, self.batch_size, epoch)?;
        Ok(())
    }
}
