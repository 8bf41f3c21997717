use crate::error::{TrainingError, TrainingResult};
use ndarray::{s, Array1, Array2, Array4};
use std::ops::Range;

/// Model inputs: an image stack (`N x H x W x C`) and one auxiliary feature
/// vector per sample (`N x F`).
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub images: Array4<f32>,
    pub features: Array2<f32>,
}

impl Inputs {
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.shape()[0]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Image dimensions of a single sample, `(H, W, C)`.
    #[must_use]
    pub fn image_dims(&self) -> (usize, usize, usize) {
        let shape = self.images.shape();
        (shape[1], shape[2], shape[3])
    }

    #[must_use]
    pub fn feature_dim(&self) -> usize {
        self.features.shape()[1]
    }

    /// Copy out the samples in `range` along the leading axis.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            images: self.images.slice(s![range.clone(), .., .., ..]).to_owned(),
            features: self.features.slice(s![range, ..]).to_owned(),
        }
    }
}

/// One `(inputs, target)` batch yielded by a [`BatchSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Inputs,
    pub targets: Array1<f32>,
}

impl Batch {
    #[must_use]
    pub fn new(images: Array4<f32>, features: Array2<f32>, targets: Array1<f32>) -> Self {
        Self { inputs: Inputs { images, features }, targets }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Check that images, features and targets share a non-zero leading dimension.
    pub fn validate(&self) -> TrainingResult<()> {
        let n = self.targets.len();
        if n == 0 {
            return Err(TrainingError::ShapeMismatch("batch is empty".to_string()));
        }
        if self.inputs.images.shape()[0] != n || self.inputs.features.shape()[0] != n {
            return Err(TrainingError::ShapeMismatch(format!(
                "leading dimensions differ: images {}, features {}, targets {}",
                self.inputs.images.shape()[0],
                self.inputs.features.shape()[0],
                n
            )));
        }
        Ok(())
    }
}

/// Indexed source of batches, shared between the training loop and its
/// loader workers.
pub trait BatchSource: Send + Sync {
    /// Number of batches per epoch.
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> TrainingResult<Batch>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called by the fit routine after every training epoch.
    fn on_epoch_end(&self) {}
}

/// A [`BatchSource`] over batches already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    batches: Vec<Batch>,
}

impl InMemorySource {
    #[must_use]
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }
}

impl BatchSource for InMemorySource {
    fn len(&self) -> usize {
        self.batches.len()
    }

    fn get(&self, index: usize) -> TrainingResult<Batch> {
        self.batches.get(index).cloned().ok_or_else(|| {
            TrainingError::Source(format!("batch index {index} out of range (len {})", self.batches.len()))
        })
    }
}
