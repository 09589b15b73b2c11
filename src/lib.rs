//! Move prediction on professional Go games.
//!
//! Trains a small convolutional network to predict the next move from
//! pre-featurized board positions (11 feature planes over a 19x19 board,
//! one-hot move labels). Features and labels are read from two NPY files,
//! split 90/10 into training and test data, and the network is fitted for a
//! single pass before accuracy is reported on the held-out positions.
//!
//! The pipeline is strictly sequential: load, split, build, train, evaluate.

pub mod data;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod training;
