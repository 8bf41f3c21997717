//! Qualitative accuracy plot over a fixed evaluation sample.
//!
//! The evaluation batch is the first [`EVAL_BATCHES`] batches of the
//! validation source stacked into one `4 x batch_size` sample. Predictions
//! and targets are rescaled to metres and drawn as two stacked panels: the
//! full cloud base height range and a zoom on the lowest kilometre.

use crate::config::VisualizationSettings;
use crate::dataset::{BatchSource, Inputs};
use crate::error::{TrainingError, TrainingResult};
use crate::layout::RunLayout;
use crate::model::{self, Model};
use crate::rescale::Rescaler;
use ndarray::{s, Array1, Array2, Array4};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of validation batches stacked into the evaluation sample.
pub const EVAL_BATCHES: usize = 4;

/// Stacked evaluation sample with a shared leading dimension of
/// `EVAL_BATCHES * batch_size`.
#[derive(Debug, Clone)]
pub struct EvaluationBatch {
    pub inputs: Inputs,
    pub targets: Array1<f32>,
}

impl EvaluationBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Max, min and median of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub max: f32,
    pub min: f32,
    pub median: f32,
}

impl SeriesStats {
    pub fn of<'a>(values: impl IntoIterator<Item = &'a f32>) -> Option<Self> {
        let mut sorted: Vec<f32> = values.into_iter().copied().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f32::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] };
        Some(Self { max: sorted[sorted.len() - 1], min: sorted[0], median })
    }
}

/// Stack the first [`EVAL_BATCHES`] batches of `source` into one evaluation sample.
///
/// Every batch must hold exactly `batch_size` samples with the image and
/// feature shape of batch 0.
pub fn assemble_evaluation_batch(source: &dyn BatchSource, batch_size: usize) -> TrainingResult<EvaluationBatch> {
    let available = source.len();
    if available < EVAL_BATCHES {
        return Err(TrainingError::InsufficientBatches { required: EVAL_BATCHES, available });
    }
    if batch_size == 0 {
        return Err(TrainingError::InvalidConfig("batch_size must be >= 1".to_string()));
    }

    let n_iter = EVAL_BATCHES * batch_size;
    let mut images: Option<Array4<f32>> = None;
    let mut features: Option<Array2<f32>> = None;
    let mut targets = Array1::<f32>::zeros(n_iter);

    for k in 0..EVAL_BATCHES {
        let batch = source.get(k)?;
        batch.validate()?;
        if batch.len() != batch_size {
            return Err(TrainingError::ShapeMismatch(format!(
                "evaluation batch {k} has {} samples, expected {batch_size}",
                batch.len()
            )));
        }

        let (h, w, c) = batch.inputs.image_dims();
        let f = batch.inputs.feature_dim();
        let images = images.get_or_insert_with(|| Array4::zeros((n_iter, h, w, c)));
        let features = features.get_or_insert_with(|| Array2::zeros((n_iter, f)));
        if images.shape()[1..] != [h, w, c] || features.shape()[1] != f {
            return Err(TrainingError::ShapeMismatch(format!(
                "evaluation batch {k} has images {:?} and {f} features, expected {:?} and {}",
                (h, w, c),
                &images.shape()[1..],
                features.shape()[1]
            )));
        }

        let rows = k * batch_size..(k + 1) * batch_size;
        images.slice_mut(s![rows.clone(), .., .., ..]).assign(&batch.inputs.images);
        features.slice_mut(s![rows.clone(), ..]).assign(&batch.inputs.features);
        targets.slice_mut(s![rows]).assign(&batch.targets);
    }

    let (Some(images), Some(features)) = (images, features) else {
        return Err(TrainingError::Source("validation source yielded no batches".to_string()));
    };

    log_stats("targets", targets.iter());
    log_stats("features", features.iter());
    log_stats("images", images.iter());

    Ok(EvaluationBatch { inputs: Inputs { images, features }, targets })
}

fn log_stats<'a>(name: &str, values: impl IntoIterator<Item = &'a f32>) {
    if let Some(stats) = SeriesStats::of(values) {
        debug!(array = name, max = stats.max, min = stats.min, median = stats.median, "evaluation batch stats");
    }
}

/// Predict on the evaluation sample and write `preds_<epoch>.png`.
pub fn plot_prediction(
    model: &dyn Model,
    source: &dyn BatchSource,
    settings: &VisualizationSettings,
    layout: &RunLayout,
    batch_size: usize,
    epoch: usize,
) -> TrainingResult<PathBuf> {
    settings.validate()?;
    let eval = assemble_evaluation_batch(source, batch_size)?;
    let raw = model::predict(model, &eval.inputs, batch_size)?;

    let rescaler = Rescaler::default();
    let predicted = rescaler.rescale(&raw, settings.vmin, settings.vmax);
    let truth = rescaler.rescale(&eval.targets, settings.vmin, settings.vmax);

    let path = layout.prediction_plot_path(epoch);
    let series = ComparisonSeries { predicted: &predicted, predicted_raw: &raw, truth: &truth, truth_raw: &eval.targets };
    render_comparison(&path, &series, settings)?;
    info!(epoch, path = %path.display(), samples = eval.len(), "wrote prediction plot");
    Ok(path)
}

struct ComparisonSeries<'a> {
    predicted: &'a Array1<f32>,
    predicted_raw: &'a Array1<f32>,
    truth: &'a Array1<f32>,
    truth_raw: &'a Array1<f32>,
}

/// Legend entries `(predicted, truth)` for the full-range and zoom panels.
/// The full-range panel carries max/min of the rescaled and raw series.
fn legend_labels(series: &ComparisonSeries<'_>) -> [(String, String); 2] {
    let pred = stats_or_empty(series.predicted);
    let pred_raw = stats_or_empty(series.predicted_raw);
    let truth = stats_or_empty(series.truth);
    let truth_raw = stats_or_empty(series.truth_raw);

    [
        (
            format!(
                "Predicted Max:{:.2} | Min:{:.2} / Max_raw:{:.2} | Min_raw:{:.2}",
                pred.max, pred.min, pred_raw.max, pred_raw.min
            ),
            format!(
                "Truth Max:{:.2} | Min:{:.2} / Max_raw:{:.2} | Min_raw:{:.2}",
                truth.max, truth.min, truth_raw.max, truth_raw.min
            ),
        ),
        ("Predicted".to_string(), "Truth".to_string()),
    ]
}

fn render_comparison(path: &Path, series: &ComparisonSeries<'_>, settings: &VisualizationSettings) -> TrainingResult<()> {
    let labels = legend_labels(series);
    let ranges = [settings.full_range_max, settings.zoom_range_max];

    // The backend is dropped at the end of this scope, on success or error.
    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE).map_err(TrainingError::plot)?;
    let panels = root.split_evenly((2, 1));
    for ((panel, y_max), (pred_label, truth_label)) in panels.iter().zip(ranges).zip(labels) {
        draw_panel(panel, series.predicted, series.truth, y_max, pred_label, truth_label)?;
    }
    root.present().map_err(TrainingError::plot)?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    predicted: &Array1<f32>,
    truth: &Array1<f32>,
    y_max: f32,
    pred_label: String,
    truth_label: String,
) -> TrainingResult<()> {
    let x_max = predicted.len().max(truth.len()).saturating_sub(1).max(1) as f32;
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0f32..x_max, 0f32..y_max)
        .map_err(TrainingError::plot)?;

    chart.configure_mesh().y_desc("CBH [m]").draw().map_err(TrainingError::plot)?;

    // Values outside the panel range are pinned to its edge.
    let points = |values: &Array1<f32>| -> Vec<(f32, f32)> {
        values.iter().enumerate().map(|(i, v)| (i as f32, v.clamp(0.0, y_max))).collect()
    };

    chart
        .draw_series(LineSeries::new(points(predicted), &RED))
        .map_err(TrainingError::plot)?
        .label(pred_label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(points(truth), &GREEN))
        .map_err(TrainingError::plot)?
        .label(truth_label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(TrainingError::plot)?;
    Ok(())
}

fn stats_or_empty(values: &Array1<f32>) -> SeriesStats {
    SeriesStats::of(values.iter()).unwrap_or(SeriesStats { max: f32::NAN, min: f32::NAN, median: f32::NAN })
}
