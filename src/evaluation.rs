use std::fmt;

use burn::data::dataloader::DataLoaderBuilder;
use burn::prelude::*;

use crate::data::{GoBatcher, GoDataset};
use crate::model::GoModel;

/// Aggregate statistics from running the model over a test set.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationSummary {
    pub samples: usize,
    /// Positions where the argmax logit matched the played move.
    pub correct: usize,
    /// Mean negative log likelihood over the test set.
    pub mean_loss: f64,
}

impl EvaluationSummary {
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.correct as f64 / self.samples as f64
    }
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== evaluation ====")?;
        writeln!(f, " samples:  {}", self.samples)?;
        writeln!(f, " correct:  {}", self.correct)?;
        writeln!(f, " accuracy: {:.4}", self.accuracy())?;
        write!(f, " loss:     {:.4}", self.mean_loss)
    }
}

/// Runs inference over `dataset` and compares predicted moves against the
/// moves actually played.
pub fn evaluate<B: Backend>(
    model: &GoModel<B>,
    dataset: GoDataset,
    batch_size: usize,
) -> EvaluationSummary {
    let dataloader = DataLoaderBuilder::new(GoBatcher)
        .batch_size(batch_size)
        .build(dataset);

    let mut samples = 0;
    let mut correct = 0;
    let mut loss_sum = 0.0;

    for batch in dataloader.iter() {
        let batch_len = batch.targets.dims()[0];
        let logits = model.forward(batch.boards);

        let loss = model.loss(logits.clone(), batch.targets.clone());
        loss_sum += loss.into_scalar().elem::<f32>() as f64 * batch_len as f64;

        let predictions = logits.argmax(1).flatten::<1>(0, 1);
        let hits: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();

        samples += batch_len;
        correct += hits as usize;
    }

    EvaluationSummary {
        samples,
        correct,
        mean_loss: loss_sum / samples.max(1) as f64,
    }
}
