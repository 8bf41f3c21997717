use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Label namespacing every artifact of one training run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(&self) -> TrainingResult<()> {
        let id = self.0.trim();
        if id.is_empty() {
            return Err(TrainingError::InvalidConfig("run_id is required".to_string()));
        }
        if id != self.0 || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(TrainingError::InvalidConfig(format!(
                "run_id must be a single path component: {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSettings {
    /// Only write a snapshot when `monitor` improves.
    #[serde(default)]
    pub save_best_only: bool,
    #[serde(default = "default_monitor")]
    pub monitor: String,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self { save_best_only: false, monitor: default_monitor() }
    }
}

/// Reduce-on-plateau schedule for the learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LrPlateauSettings {
    pub monitor: String,
    pub factor: f64,
    pub patience: usize,
    pub min_delta: f64,
    pub cooldown: usize,
    pub min_lr: f64,
}

impl Default for LrPlateauSettings {
    fn default() -> Self {
        Self {
            monitor: default_monitor(),
            factor: 0.5,
            patience: 5,
            min_delta: 1e-4,
            cooldown: 0,
            min_lr: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFreq {
    #[default]
    Batch,
    Epoch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsLogSettings {
    #[serde(default)]
    pub update_freq: UpdateFreq,
}

/// Physical range and canvas for the prediction plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationSettings {
    pub vmin: f32,
    pub vmax: f32,
    pub full_range_max: f32,
    pub zoom_range_max: f32,
    pub width: u32,
    pub height: u32,
}

impl VisualizationSettings {
    /// Reject non-finite bounds, an empty physical range, non-positive panel
    /// ranges and an empty canvas.
    pub fn validate(&self) -> TrainingResult<()> {
        if !(self.vmin.is_finite() && self.vmax.is_finite() && self.vmax > self.vmin) {
            return Err(TrainingError::InvalidConfig("visualization.vmax must exceed vmin".to_string()));
        }
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !(positive(self.full_range_max) && positive(self.zoom_range_max)) {
            return Err(TrainingError::InvalidConfig("visualization ranges must be > 0".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(TrainingError::InvalidConfig("visualization canvas must be non-empty".to_string()));
        }
        Ok(())
    }
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        Self {
            vmin: -1.0,
            vmax: 10_000.0,
            full_range_max: 10_000.0,
            zoom_range_max: 1_000.0,
            width: 1024,
            height: 768,
        }
    }
}

/// Immutable configuration of one training invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRunConfig {
    pub run_id: RunId,
    pub outpath: PathBuf,
    pub batch_size: usize,
    pub epochs: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_true")]
    pub shuffle: bool,
    #[serde(default)]
    pub enable_visualization: bool,
    /// Seed for the per-epoch batch shuffle.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_tb_log_root")]
    pub tb_log_root: PathBuf,
    #[serde(default)]
    pub checkpoint: CheckpointSettings,
    #[serde(default)]
    pub lr_schedule: LrPlateauSettings,
    #[serde(default)]
    pub metrics_log: MetricsLogSettings,
    #[serde(default)]
    pub visualization: VisualizationSettings,
}

fn default_monitor() -> String {
    "val_loss".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_tb_log_root() -> PathBuf {
    PathBuf::from("./tb_log")
}

impl TrainingRunConfig {
    #[must_use]
    pub fn new(run_id: RunId, outpath: impl Into<PathBuf>, batch_size: usize, epochs: usize) -> Self {
        Self {
            run_id,
            outpath: outpath.into(),
            batch_size,
            epochs,
            workers: default_workers(),
            shuffle: true,
            enable_visualization: false,
            seed: None,
            tb_log_root: default_tb_log_root(),
            checkpoint: CheckpointSettings::default(),
            lr_schedule: LrPlateauSettings::default(),
            metrics_log: MetricsLogSettings::default(),
            visualization: VisualizationSettings::default(),
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn with_visualization(mut self, enabled: bool) -> Self {
        self.enable_visualization = enabled;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_tb_log_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.tb_log_root = root.into();
        self
    }

    /// Load a run configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> TrainingResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TrainingError::InvalidConfig(format!("failed to serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> TrainingResult<()> {
        self.run_id.validate()?;
        if self.outpath.as_os_str().is_empty() {
            return Err(TrainingError::InvalidConfig("outpath is required".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidConfig("batch_size must be >= 1".to_string()));
        }
        if self.epochs == 0 {
            return Err(TrainingError::InvalidConfig("epochs must be >= 1".to_string()));
        }

        let lr = &self.lr_schedule;
        if !(lr.factor > 0.0 && lr.factor < 1.0) {
            return Err(TrainingError::InvalidConfig("lr_schedule.factor must be in (0, 1)".to_string()));
        }
        if !lr.min_delta.is_finite() || lr.min_delta < 0.0 {
            return Err(TrainingError::InvalidConfig("lr_schedule.min_delta must be >= 0".to_string()));
        }
        if !lr.min_lr.is_finite() || lr.min_lr < 0.0 {
            return Err(TrainingError::InvalidConfig("lr_schedule.min_lr must be >= 0".to_string()));
        }

        self.visualization.validate()
    }
}
