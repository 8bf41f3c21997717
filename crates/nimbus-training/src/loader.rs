use crate::dataset::{Batch, BatchSource};
use crate::error::{TrainingError, TrainingResult};
use futures::stream::{self, BoxStream, StreamExt};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Per-epoch batch order over a source of `len` batches.
pub struct BatchOrder {
    len: usize,
    shuffle: bool,
    rng: StdRng,
}

impl BatchOrder {
    #[must_use]
    pub fn new(len: usize, shuffle: bool, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { len, shuffle, rng }
    }

    /// Indices for the next epoch: `0..len`, permuted when shuffling.
    pub fn next_epoch(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        order
    }
}

/// Stream the batches at `order` from `source`, in order.
///
/// With `workers == 0` each batch is fetched on the polling task. Otherwise up
/// to `workers` fetches run concurrently on the blocking thread pool.
pub fn batch_stream(
    source: Arc<dyn BatchSource>,
    order: Vec<usize>,
    workers: usize,
) -> BoxStream<'static, TrainingResult<Batch>> {
    if workers == 0 {
        return stream::iter(order).map(move |idx| source.get(idx)).boxed();
    }

    stream::iter(order)
        .map(move |idx| {
            let source = Arc::clone(&source);
            async move {
                tokio::task::spawn_blocking(move || source.get(idx))
                    .await
                    .map_err(|e| TrainingError::Source(format!("batch worker for index {idx} failed: {e}")))?
            }
        })
        .buffered(workers)
        .boxed()
}
