use burn::data::dataloader::DataLoaderBuilder;
use burn::optim::{AdaGradConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::data::{GoBatcher, GoDataset, BOARD_SIZE, PLANES};
use crate::error::{ConfigError, TrainError};
use crate::model::{GoModel, GoModelConfig};

/// Hyperparameters of the training pass. Defaults reproduce the original
/// run: seed 1337, learning rate 0.1, AdaGrad, one epoch, loss reported
/// every 10 iterations.
#[derive(Config)]
pub struct TrainingConfig {
    pub model: GoModelConfig,
    pub optimizer: AdaGradConfig,
    #[config(default = 1337)]
    pub seed: u64,
    #[config(default = 0.1)]
    pub learning_rate: f64,
    #[config(default = 1)]
    pub num_epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 10)]
    pub log_interval: usize,
}

impl TrainingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("num_epochs", self.num_epochs),
            ("batch_size", self.batch_size),
            ("num_workers", self.num_workers),
            ("log_interval", self.log_interval),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(ConfigError::ZeroSize { name });
            }
        }
        Ok(())
    }
}

/// Fits a freshly initialized [`GoModel`] to `dataset`.
///
/// Seeds the backend, then runs minibatch gradient descent for the
/// configured number of epochs, logging the batch loss every
/// `log_interval` iterations. A non-finite loss aborts the run instead of
/// silently continuing.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    dataset: GoDataset,
    device: B::Device,
) -> Result<GoModel<B>, TrainError> {
    config.validate()?;

    if config.model.planes != PLANES || config.model.board_size != BOARD_SIZE {
        return Err(TrainError::ShapeMismatch {
            expected_planes: config.model.planes,
            expected_board: config.model.board_size,
            planes: PLANES,
            size: BOARD_SIZE,
        });
    }

    B::seed(config.seed);

    let mut model = config.model.init::<B>(&device)?;
    let mut optim = config.optimizer.init::<B, GoModel<B>>();

    let dataloader = DataLoaderBuilder::new(GoBatcher)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset);

    for epoch in 1..=config.num_epochs {
        for (iteration, batch) in dataloader.iter().enumerate() {
            let logits = model.forward(batch.boards);
            let loss = model.loss(logits, batch.targets);
            let loss_value = loss.clone().into_scalar().elem::<f32>();

            if !loss_value.is_finite() {
                return Err(TrainError::NonFiniteLoss {
                    epoch,
                    iteration,
                    loss: loss_value,
                });
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);

            if iteration % config.log_interval == 0 {
                log::info!(
                    "epoch {epoch}/{}, iteration {iteration}: loss {loss_value:.4}",
                    config.num_epochs
                );
            }
        }
    }

    Ok(model)
}
