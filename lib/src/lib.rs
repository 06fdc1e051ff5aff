//! Predicting hourly bike rentals with a one hidden layer network trained by gradient descent.
//!
//! [`network::NeuralNetwork`] is the core. [`data`] turns the raw hourly table into
//! standardised, split matrices, [`experiment`] drives training over random batches and
//! [`report`] writes out what a run produced.

pub mod data;
pub mod error;
pub mod experiment;
pub mod loss;
pub mod network;
pub mod report;
pub mod utils;

pub use error::{Error, Result};
pub use experiment::{Experiment, Hyperparameters, Outcome};
pub use network::{Activation, NeuralNetwork};
