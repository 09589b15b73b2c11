use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use ndarray::{Array, Array2, Array4, Axis, Dimension};
use ndarray_npy::{ReadNpyError, ReadNpyExt};

use crate::error::DataError;

/// Number of feature planes per board position:
///
/// 1-4. black stones with 1, 2, 3, 4+ liberties
/// 5-8. white stones with 1, 2, 3, 4+ liberties
/// 9.   black plays next
/// 10.  white plays next
/// 11.  move would be illegal due to ko
pub const PLANES: usize = 11;

/// Side length of the Go board.
pub const BOARD_SIZE: usize = 19;

/// Size of the move space, one entry per intersection.
pub const NUM_MOVES: usize = BOARD_SIZE * BOARD_SIZE;

/// One featurized board position and the move a professional played from it.
#[derive(Clone, Debug)]
pub struct GoItem {
    /// Flattened plane-major board encoding, `PLANES * BOARD_SIZE * BOARD_SIZE` values.
    pub board: Vec<f32>,
    /// Index of the played move in `0..NUM_MOVES`.
    pub move_index: usize,
}

/// In-memory dataset of featurized Go positions.
#[derive(Debug)]
pub struct GoDataset {
    items: Vec<GoItem>,
}

impl GoDataset {
    /// Loads features and labels from two NPY files.
    ///
    /// The feature file must hold `[N, PLANES, BOARD_SIZE, BOARD_SIZE]` and
    /// the label file `[N, NUM_MOVES]` one-hot rows. Payloads may be `f32`
    /// or `f64`; doubles are narrowed on load.
    pub fn from_npy(
        features_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
    ) -> Result<Self, DataError> {
        let features: Array4<f32> = read_npy_f32(features_path.as_ref())?;
        let labels: Array2<f32> = read_npy_f32(labels_path.as_ref())?;
        Self::from_arrays(features, labels)
    }

    /// Builds a dataset from already-loaded arrays, validating shapes and
    /// decoding each one-hot label row to its move index.
    pub fn from_arrays(features: Array4<f32>, labels: Array2<f32>) -> Result<Self, DataError> {
        let (samples, planes, rows, cols) = features.dim();
        if planes != PLANES || rows != BOARD_SIZE || cols != BOARD_SIZE {
            return Err(DataError::FeatureShape {
                found: features.shape().to_vec(),
                planes: PLANES,
                size: BOARD_SIZE,
            });
        }

        let (label_samples, moves) = labels.dim();
        if moves != NUM_MOVES {
            return Err(DataError::LabelShape {
                found: labels.shape().to_vec(),
                moves: NUM_MOVES,
            });
        }
        if samples != label_samples {
            return Err(DataError::SampleCountMismatch {
                features: samples,
                labels: label_samples,
            });
        }

        let mut items = Vec::with_capacity(samples);
        for index in 0..samples {
            let board = features.index_axis(Axis(0), index).iter().copied().collect();
            let move_index = decode_one_hot(labels.index_axis(Axis(0), index), index)?;
            items.push(GoItem { board, move_index });
        }

        Ok(Self { items })
    }

    /// Partitions the dataset into training and test subsets.
    ///
    /// The split is order-preserving: the first `round(fraction * N)` samples
    /// become the training set and the remainder the test set. Shuffling is
    /// left to the training dataloader so the partition itself stays
    /// reproducible. Fails when either partition would be empty.
    pub fn split(self, fraction: f64) -> Result<(Self, Self), DataError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(DataError::InvalidFraction { fraction });
        }

        let len = self.items.len();
        let train_len = (fraction * len as f64).round() as usize;
        if train_len == 0 || train_len == len {
            return Err(DataError::DegenerateSplit { len });
        }

        let mut train = self.items;
        let test = train.split_off(train_len);
        Ok((Self { items: train }, Self { items: test }))
    }
}

impl Dataset<GoItem> for GoDataset {
    fn get(&self, index: usize) -> Option<GoItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Reads an NPY file as `f32`. Only a dtype mismatch triggers the `f64`
/// fallback; any other failure (missing file, truncated data) surfaces the
/// original `f32` error.
fn read_npy_f32<D>(path: &Path) -> Result<Array<f32, D>, DataError>
where
    D: Dimension,
    Array<f32, D>: ReadNpyExt,
    Array<f64, D>: ReadNpyExt,
{
    match ndarray_npy::read_npy::<_, Array<f32, D>>(path) {
        Ok(array) => Ok(array),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            ndarray_npy::read_npy::<_, Array<f64, D>>(path)
                .map(|array| array.mapv(|value| value as f32))
                .map_err(|source| DataError::NpyRead {
                    path: path.to_path_buf(),
                    source,
                })
        }
        Err(source) => Err(DataError::NpyRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn decode_one_hot(row: ndarray::ArrayView1<'_, f32>, index: usize) -> Result<usize, DataError> {
    let mut hot = row.iter().enumerate().filter(|(_, &value)| value >= 0.5);
    match (hot.next(), hot.next()) {
        (Some((move_index, _)), None) => Ok(move_index),
        (None, _) => Err(DataError::MalformedLabel { index, hot: 0 }),
        _ => Err(DataError::MalformedLabel {
            index,
            hot: row.iter().filter(|&&value| value >= 0.5).count(),
        }),
    }
}

/// Stacks [`GoItem`]s into batched tensors.
#[derive(Clone, Debug, Default)]
pub struct GoBatcher;

#[derive(Clone, Debug)]
pub struct GoBatch<B: Backend> {
    /// `[batch, PLANES, BOARD_SIZE, BOARD_SIZE]` board encodings.
    pub boards: Tensor<B, 4>,
    /// `[batch]` move indices.
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, GoItem, GoBatch<B>> for GoBatcher {
    fn batch(&self, items: Vec<GoItem>, device: &B::Device) -> GoBatch<B> {
        let boards = items
            .iter()
            .map(|item| {
                Tensor::<B, 4>::from_data(
                    TensorData::new(item.board.clone(), [1, PLANES, BOARD_SIZE, BOARD_SIZE]),
                    device,
                )
            })
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    TensorData::new(vec![item.move_index as i64], [1]),
                    device,
                )
            })
            .collect();

        GoBatch {
            boards: Tensor::cat(boards, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}
