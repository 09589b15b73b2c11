use anyhow::Context;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::optim::AdaGradConfig;
use env_logger::Env;

use go_move_predictor::data::GoDataset;
use go_move_predictor::evaluation;
use go_move_predictor::model::GoModelConfig;
use go_move_predictor::training::{self, TrainingConfig};

/// Pre-featurized positions from professional games, about 15-20 games
/// worth of moves.
const FEATURES_PATH: &str = "data/features_3000.npy";
const LABELS_PATH: &str = "data/labels_3000.npy";

const SPLIT_FRACTION: f64 = 0.9;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let device = NdArrayDevice::Cpu;

    let dataset = GoDataset::from_npy(FEATURES_PATH, LABELS_PATH)
        .context("loading the packaged Go dataset")?;
    log::info!("loaded {} board positions", dataset.len());

    let (train_set, test_set) = dataset.split(SPLIT_FRACTION)?;
    log::info!(
        "split into {} training and {} test positions",
        train_set.len(),
        test_set.len()
    );

    let config = TrainingConfig::new(GoModelConfig::new(), AdaGradConfig::new());
    let model = training::train::<Autodiff<NdArray>>(&config, train_set, device)
        .context("training failed")?;

    let summary = evaluation::evaluate(&model.valid(), test_set, config.batch_size);
    log::info!("{summary}");

    Ok(())
}
