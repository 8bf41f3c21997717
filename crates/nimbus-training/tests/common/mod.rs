//! Shared test utilities for Nimbus Training integration tests.

#![allow(dead_code)]

use ndarray::{Array1, Array2, Array4};
use nimbus_training::{Batch, BatchSource, InMemorySource, Inputs, Model, RunId, TrainingError, TrainingResult, TrainingRunConfig};
use std::path::Path;
use std::sync::Arc;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Regressor over the sum of auxiliary features, trained with SGD on MSE.
pub struct LinearRegressor {
    pub weight: f32,
    pub bias: f32,
    pub lr: f64,
}

impl LinearRegressor {
    pub fn new(lr: f64) -> Self {
        Self { weight: 0.1, bias: 0.0, lr }
    }

    fn forward(&self, inputs: &Inputs) -> Array1<f32> {
        inputs.features.rows().into_iter().map(|row| self.weight * row.sum() + self.bias).collect()
    }

    fn mse(&self, batch: &Batch) -> f64 {
        let err = self.forward(&batch.inputs) - &batch.targets;
        f64::from(err.mapv(|e| e * e).mean().unwrap_or(0.0))
    }
}

impl Model for LinearRegressor {
    fn train_on_batch(&mut self, batch: &Batch) -> TrainingResult<f64> {
        let loss = self.mse(batch);
        let pred = self.forward(&batch.inputs);
        let n = batch.len() as f32;
        let (mut gw, mut gb) = (0.0, 0.0);
        for (i, row) in batch.inputs.features.rows().into_iter().enumerate() {
            let e = pred[i] - batch.targets[i];
            gw += 2.0 * e * row.sum() / n;
            gb += 2.0 * e / n;
        }
        self.weight -= self.lr as f32 * gw;
        self.bias -= self.lr as f32 * gb;
        Ok(loss)
    }

    fn test_on_batch(&self, batch: &Batch) -> TrainingResult<f64> {
        Ok(self.mse(batch))
    }

    fn predict_on_batch(&self, inputs: &Inputs) -> TrainingResult<Array1<f32>> {
        Ok(self.forward(inputs))
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    fn save(&self, path: &Path) -> TrainingResult<()> {
        std::fs::write(path, format!("{} {}\n", self.weight, self.bias))?;
        Ok(())
    }
}

/// Model whose training step always fails.
pub struct BrokenModel;

impl Model for BrokenModel {
    fn train_on_batch(&mut self, _batch: &Batch) -> TrainingResult<f64> {
        Err(TrainingError::Model("out of memory".to_string()))
    }

    fn test_on_batch(&self, _batch: &Batch) -> TrainingResult<f64> {
        Ok(0.0)
    }

    fn predict_on_batch(&self, inputs: &Inputs) -> TrainingResult<Array1<f32>> {
        Ok(Array1::zeros(inputs.len()))
    }

    fn learning_rate(&self) -> f64 {
        0.0
    }

    fn set_learning_rate(&mut self, _lr: f64) {}

    fn save(&self, _path: &Path) -> TrainingResult<()> {
        Ok(())
    }
}

/// Batch of `n` samples with 8x8x1 images and 2 features; normalized targets.
pub fn make_batch(n: usize, seed: usize) -> Batch {
    let base = seed as f32 * 0.1;
    let images = Array4::from_shape_fn((n, 8, 8, 1), |(i, y, x, _)| base + (i * 64 + y * 8 + x) as f32 / 512.0);
    let features = Array2::from_shape_fn((n, 2), |(i, j)| base + (i + j) as f32 * 0.05);
    let targets = Array1::from_shape_fn(n, |i| (base + i as f32 * 0.05 - 0.5).clamp(-1.0, 1.0));
    Batch::new(images, features, targets)
}

pub fn make_source(batches: usize, batch_size: usize) -> Arc<dyn BatchSource> {
    Arc::new(InMemorySource::new((0..batches).map(|i| make_batch(batch_size, i)).collect()))
}

/// Run config writing every artifact below `root`.
pub fn test_config(root: &Path, run_id: &str, batch_size: usize, epochs: usize) -> TrainingRunConfig {
    TrainingRunConfig::new(RunId::new(run_id), root, batch_size, epochs)
        .with_tb_log_root(root.join("tb_log"))
        .with_seed(7)
}
