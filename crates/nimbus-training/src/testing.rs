//! Fixtures shared by the unit tests.

use crate::dataset::{Batch, Inputs};
use crate::error::TrainingResult;
use crate::model::Model;
use ndarray::{Array1, Array2, Array4};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Linear model over the mean auxiliary feature, trained with plain SGD.
pub struct StubModel {
    weight: f32,
    bias: f32,
    lr: f64,
    predict_calls: AtomicUsize,
}

impl StubModel {
    pub fn new(lr: f64) -> Self {
        Self { weight: 0.5, bias: 0.0, lr, predict_calls: AtomicUsize::new(0) }
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    fn forward(&self, inputs: &Inputs) -> Array1<f32> {
        inputs
            .features
            .rows()
            .into_iter()
            .map(|row| self.weight * row.mean().unwrap_or(0.0) + self.bias)
            .collect()
    }

    fn mse(&self, batch: &Batch) -> f64 {
        let pred = self.forward(&batch.inputs);
        let err = &pred - &batch.targets;
        f64::from(err.mapv(|e| e * e).mean().unwrap_or(0.0))
    }
}

impl Model for StubModel {
    fn train_on_batch(&mut self, batch: &Batch) -> TrainingResult<f64> {
        let loss = self.mse(batch);
        let pred = self.forward(&batch.inputs);
        let n = batch.len() as f32;
        let mut grad_w = 0.0;
        let mut grad_b = 0.0;
        for (i, row) in batch.inputs.features.rows().into_iter().enumerate() {
            let x = row.mean().unwrap_or(0.0);
            let e = pred[i] - batch.targets[i];
            grad_w += 2.0 * e * x / n;
            grad_b += 2.0 * e / n;
        }
        self.weight -= self.lr as f32 * grad_w;
        self.bias -= self.lr as f32 * grad_b;
        Ok(loss)
    }

    fn test_on_batch(&self, batch: &Batch) -> TrainingResult<f64> {
        Ok(self.mse(batch))
    }

    fn predict_on_batch(&self, inputs: &Inputs) -> TrainingResult<Array1<f32>> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.forward(inputs))
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    fn save(&self, path: &Path) -> TrainingResult<()> {
        let snapshot = serde_json::json!({ "weight": self.weight, "bias": self.bias, "lr": self.lr });
        std::fs::write(path, serde_json::to_vec(&snapshot)?)?;
        Ok(())
    }
}

/// A batch of `n` samples with 4x4x1 images and 3 features; targets lie in `[-1, 1]`.
pub fn sample_batch(n: usize, offset: f32) -> Batch {
    let images = Array4::from_shape_fn((n, 4, 4, 1), |(i, y, x, _)| offset + (i + y + x) as f32 * 0.01);
    let features = Array2::from_shape_fn((n, 3), |(i, j)| offset + (i * 3 + j) as f32 * 0.1);
    let targets = Array1::from_shape_fn(n, |i| ((offset + i as f32 * 0.25).sin()).clamp(-1.0, 1.0));
    Batch::new(images, features, targets)
}
