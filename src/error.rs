use std::path::PathBuf;

use ndarray_npy::ReadNpyError;

/// Errors raised while loading or partitioning the Go dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read numpy array from {path}: {source}")]
    NpyRead {
        path: PathBuf,
        #[source]
        source: ReadNpyError,
    },

    #[error("feature array has shape {found:?}, expected [N, {planes}, {size}, {size}]")]
    FeatureShape {
        found: Vec<usize>,
        planes: usize,
        size: usize,
    },

    #[error("label array has shape {found:?}, expected [N, {moves}]")]
    LabelShape { found: Vec<usize>, moves: usize },

    #[error("feature/label sample counts differ: {features} features vs {labels} labels")]
    SampleCountMismatch { features: usize, labels: usize },

    #[error("label row {index} is not one-hot ({hot} hot entries)")]
    MalformedLabel { index: usize, hot: usize },

    #[error("split fraction {fraction} is outside the open interval (0, 1)")]
    InvalidFraction { fraction: f64 },

    #[error("cannot split {len} samples into non-empty training and test partitions")]
    DegenerateSplit { len: usize },
}

/// Invalid hyperparameter combinations, caught before any layer is built.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroSize { name: &'static str },

    #[error(
        "{layer} would shrink the {input}x{input} feature map to {output}; \
         kernel or pool size too large for the board"
    )]
    FeatureMapCollapse {
        layer: &'static str,
        input: usize,
        output: isize,
    },
}

/// Errors raised during the training pass.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "model expects {expected_planes} planes on a {expected_board}x{expected_board} board, \
         dataset provides {planes} planes on {size}x{size}"
    )]
    ShapeMismatch {
        expected_planes: usize,
        expected_board: usize,
        planes: usize,
        size: usize,
    },

    #[error("non-finite loss ({loss}) at epoch {epoch}, iteration {iteration}; training diverged")]
    NonFiniteLoss {
        epoch: usize,
        iteration: usize,
        loss: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_display() {
        let err = DataError::DegenerateSplit { len: 1 };
        assert_eq!(
            err.to_string(),
            "cannot split 1 samples into non-empty training and test partitions"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::FeatureMapCollapse {
            layer: "first max-pool",
            input: 3,
            output: 0,
        };
        assert!(err.to_string().contains("first max-pool"));
        assert!(err.to_string().contains("3x3"));
    }

    #[test]
    fn train_error_wraps_config_error() {
        let err = TrainError::from(ConfigError::ZeroSize {
            name: "conv1_channels",
        });
        assert_eq!(err.to_string(), "conv1_channels must be greater than zero");
    }
}
