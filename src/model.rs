use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::error::ConfigError;

/// Convolutional move-prediction network.
///
/// With the default configuration:
/// ```text
/// Input:  [batch, 11, 19, 19]
/// Conv1:  11 -> 50 channels, 3x3 kernel       => [batch, 50, 17, 17]
/// ReLU, MaxPool 2x2 stride 1                  => [batch, 50, 16, 16]
/// Conv2:  50 -> 20 channels, 3x3 kernel       => [batch, 20, 14, 14]
/// ReLU, MaxPool 2x2 stride 1                  => [batch, 20, 13, 13]
/// Flatten: 20*13*13 = 3380
/// Dense:  3380 -> 500, ReLU
/// Output: 500 -> 361  (one logit per intersection)
/// ```
#[derive(Module, Debug)]
pub struct GoModel<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    dense: Linear<B>,
    output: Linear<B>,
    activation: Relu,
}

/// Hyperparameters of [`GoModel`], defaulting to the values used for the
/// professional-game dataset. Validated before any layer is constructed.
#[derive(Config, Debug)]
pub struct GoModelConfig {
    /// Input feature planes per position.
    #[config(default = 11)]
    pub planes: usize,
    /// Side length of the board.
    #[config(default = 19)]
    pub board_size: usize,
    #[config(default = 50)]
    pub conv1_channels: usize,
    #[config(default = 20)]
    pub conv2_channels: usize,
    #[config(default = 500)]
    pub dense_size: usize,
    /// Square kernel side for both convolutions, stride 1.
    #[config(default = 3)]
    pub kernel_size: usize,
    /// Square window side for both max-pools, stride 1.
    #[config(default = 2)]
    pub pool_size: usize,
}

impl GoModelConfig {
    /// Size of the move space for the configured board.
    pub fn num_moves(&self) -> usize {
        self.board_size * self.board_size
    }

    /// Spatial extent of the feature map after both conv/pool stages, or an
    /// error if any stage would collapse it below 1x1.
    fn final_map_size(&self) -> Result<usize, ConfigError> {
        let mut size = self.board_size;
        let stages = [
            ("first convolution", self.kernel_size),
            ("first max-pool", self.pool_size),
            ("second convolution", self.kernel_size),
            ("second max-pool", self.pool_size),
        ];
        for (layer, window) in stages {
            let out = size as isize - window as isize + 1;
            if out < 1 {
                return Err(ConfigError::FeatureMapCollapse {
                    layer,
                    input: size,
                    output: out,
                });
            }
            size = out as usize;
        }
        Ok(size)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("planes", self.planes),
            ("board_size", self.board_size),
            ("conv1_channels", self.conv1_channels),
            ("conv2_channels", self.conv2_channels),
            ("dense_size", self.dense_size),
            ("kernel_size", self.kernel_size),
            ("pool_size", self.pool_size),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(ConfigError::ZeroSize { name });
            }
        }
        self.final_map_size().map(|_| ())
    }

    /// Initializes the model with Xavier-initialized weights on `device`,
    /// failing fast on invalid hyperparameter combinations.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<GoModel<B>, ConfigError> {
        self.validate()?;

        let map_size = self.final_map_size()?;
        let flattened = self.conv2_channels * map_size * map_size;
        let initializer = Initializer::XavierNormal { gain: 1.0 };

        Ok(GoModel {
            conv1: Conv2dConfig::new(
                [self.planes, self.conv1_channels],
                [self.kernel_size; 2],
            )
            .with_initializer(initializer.clone())
            .init(device),
            pool1: MaxPool2dConfig::new([self.pool_size; 2])
                .with_strides([1, 1])
                .init(),
            conv2: Conv2dConfig::new(
                [self.conv1_channels, self.conv2_channels],
                [self.kernel_size; 2],
            )
            .with_initializer(initializer.clone())
            .init(device),
            pool2: MaxPool2dConfig::new([self.pool_size; 2])
                .with_strides([1, 1])
                .init(),
            dense: LinearConfig::new(flattened, self.dense_size)
                .with_initializer(initializer.clone())
                .init(device),
            output: LinearConfig::new(self.dense_size, self.num_moves())
                .with_initializer(initializer)
                .init(device),
            activation: Relu::new(),
        })
    }
}

impl<B: Backend> GoModel<B> {
    /// Maps `[batch, planes, size, size]` boards to `[batch, moves]` logits.
    pub fn forward(&self, boards: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(boards));
        let x = self.pool1.forward(x);
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.pool2.forward(x);
        let x = x.flatten::<2>(1, 3);
        let x = self.activation.forward(self.dense.forward(x));
        self.output.forward(x)
    }

    /// Mean negative log likelihood of the target moves under the softmax
    /// over the logits.
    pub fn loss(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BOARD_SIZE, NUM_MOVES, PLANES};

    type TestBackend = burn::backend::NdArray;

    fn device() -> <TestBackend as Backend>::Device {
        burn::backend::ndarray::NdArrayDevice::Cpu
    }

    #[test]
    fn forward_produces_one_logit_per_intersection() {
        let model = GoModelConfig::new().init::<TestBackend>(&device()).unwrap();
        let boards = Tensor::zeros([2, PLANES, BOARD_SIZE, BOARD_SIZE], &device());
        let logits = model.forward(boards);
        assert_eq!(logits.dims(), [2, NUM_MOVES]);
    }

    #[test]
    fn loss_is_a_finite_scalar() {
        let model = GoModelConfig::new().init::<TestBackend>(&device()).unwrap();
        let boards = Tensor::zeros([3, PLANES, BOARD_SIZE, BOARD_SIZE], &device());
        let targets = Tensor::from_data(TensorData::new(vec![0i64, 180, 360], [3]), &device());
        let loss = model.loss(model.forward(boards), targets);
        assert!(loss.into_scalar().elem::<f32>().is_finite());
    }

    #[test]
    fn rejects_zero_sizes() {
        let err = GoModelConfig::new()
            .with_conv1_channels(0)
            .init::<TestBackend>(&device())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroSize {
                name: "conv1_channels"
            }
        ));
    }

    #[test]
    fn rejects_kernels_larger_than_the_feature_map() {
        let err = GoModelConfig::new()
            .with_kernel_size(20)
            .init::<TestBackend>(&device())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::FeatureMapCollapse {
                layer: "first convolution",
                ..
            }
        ));

        // A window that only collapses once both convolutions have shrunk
        // the map: 6 -> 4 -> 3 -> 1, then the final 2x2 pool cannot fit.
        let err = GoModelConfig::new()
            .with_board_size(6)
            .with_pool_size(2)
            .with_kernel_size(3)
            .init::<TestBackend>(&device())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::FeatureMapCollapse {
                layer: "second max-pool",
                ..
            }
        ));
    }

    #[test]
    fn same_seed_yields_identical_initial_weights() {
        let config = GoModelConfig::new();

        // Params materialize lazily on first access, so each snapshot must
        // be taken while its seed is still in effect.
        TestBackend::seed(1337);
        let first = config.init::<TestBackend>(&device()).unwrap();
        let first_conv1 = first.conv1.weight.val().into_data();
        let first_dense = first.dense.weight.val().into_data();

        TestBackend::seed(1337);
        let second = config.init::<TestBackend>(&device()).unwrap();
        let second_conv1 = second.conv1.weight.val().into_data();
        let second_dense = second.dense.weight.val().into_data();

        assert_eq!(first_conv1, second_conv1);
        assert_eq!(first_dense, second_dense);
    }

    #[test]
    fn different_seeds_yield_different_initial_weights() {
        let config = GoModelConfig::new();

        TestBackend::seed(1337);
        let first = config.init::<TestBackend>(&device()).unwrap();
        let first_conv1 = first.conv1.weight.val().into_data();

        TestBackend::seed(42);
        let second = config.init::<TestBackend>(&device()).unwrap();
        let second_conv1 = second.conv1.weight.val().into_data();

        assert_ne!(first_conv1, second_conv1);
    }
}
