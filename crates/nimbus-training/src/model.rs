use crate::dataset::{Batch, Inputs};
use crate::error::{TrainingError, TrainingResult};
use ndarray::{concatenate, Array1, Axis};
use std::path::Path;

/// The trainable regression model driven by the fit routine.
///
/// Architecture, loss and optimizer live behind this trait. Losses are
/// reported as the mean over the samples of the batch.
pub trait Model: Send + Sync {
    /// Run one optimizer step on `batch` and return its training loss.
    fn train_on_batch(&mut self, batch: &Batch) -> TrainingResult<f64>;

    /// Loss on `batch` without updating weights.
    fn test_on_batch(&self, batch: &Batch) -> TrainingResult<f64>;

    /// One prediction per sample of `inputs`, in the normalized target range.
    fn predict_on_batch(&self, inputs: &Inputs) -> TrainingResult<Array1<f32>>;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);

    /// Write a full snapshot of the model (weights and optimizer state) to `path`.
    fn save(&self, path: &Path) -> TrainingResult<()>;
}

/// Batched inference over `inputs` in chunks of `batch_size` samples.
pub fn predict(model: &dyn Model, inputs: &Inputs, batch_size: usize) -> TrainingResult<Array1<f32>> {
    if batch_size == 0 {
        return Err(TrainingError::InvalidConfig("batch_size must be >= 1".to_string()));
    }

    let total = inputs.len();
    let mut chunks = Vec::with_capacity(total.div_ceil(batch_size));
    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);
        let out = model.predict_on_batch(&inputs.slice(start..end))?;
        if out.len() != end - start {
            return Err(TrainingError::Model(format!(
                "predict_on_batch returned {} values for {} samples",
                out.len(),
                end - start
            )));
        }
        chunks.push(out);
        start = end;
    }

    if chunks.is_empty() {
        return Ok(Array1::zeros(0));
    }
    let views: Vec<_> = chunks.iter().map(|chunk| chunk.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| TrainingError::ShapeMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_batch, StubModel};

    #[test]
    fn test_predict_concatenates_chunks_in_order() {
        let model = StubModel::new(0.1);
        let batch = sample_batch(7, 0.0);
        let out = predict(&model, &batch.inputs, 3).unwrap();

        assert_eq!(out.len(), 7);
        assert_eq!(model.predict_calls(), 3);
        let expected = model.predict_on_batch(&batch.inputs).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_predict_rejects_zero_batch_size() {
        let model = StubModel::new(0.1);
        let batch = sample_batch(2, 0.0);
        assert!(predict(&model, &batch.inputs, 0).is_err());
    }
}
