//! Training driver: repeated random batches, loss bookkeeping and a small hyperparameter sweep.

use itertools::iproduct;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
  data::{Dataset, Split},
  loss::mse,
  network::NeuralNetwork,
  Error, Result,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
  pub iterations: usize,
  pub learning_rate: f64,
  pub hidden_nodes: usize,
  /// Rows drawn with replacement for every training step.
  pub batch_size: usize,
  /// Seeds both weight initialisation and batch sampling. Fresh entropy when absent.
  pub seed: Option<u64>,
  /// Log progress every this many iterations, 0 to stay quiet.
  pub log_every: usize,
  /// The target column the network learns.
  pub target: String,
}

impl Default for Hyperparameters {
  fn default() -> Self {
    Self {
      iterations: 1000,
      learning_rate: 0.6,
      hidden_nodes: 12,
      batch_size: 128,
      seed: None,
      log_every: 100,
      target: "cnt".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Losses {
  pub train: Vec<f64>,
  pub validation: Vec<f64>,
}

impl Losses {
  pub fn final_train(&self) -> Option<f64> {
    self.train.last().copied()
  }

  pub fn final_validation(&self) -> Option<f64> {
    self.validation.last().copied()
  }
}

#[derive(Debug, Clone)]
pub struct Outcome {
  pub hyperparameters: Hyperparameters,
  pub network: NeuralNetwork,
  pub losses: Losses,
  /// Test loss in standardised units.
  pub test_loss: f64,
  /// Test predictions mapped back to the original scale of the target.
  pub predictions: Vec<f64>,
  pub actuals: Vec<f64>,
  pub dates: Vec<String>,
}

pub struct Experiment<'a> {
  dataset: &'a Dataset,
  hyperparameters: Hyperparameters,
}

impl<'a> Experiment<'a> {
  pub fn new(dataset: &'a Dataset, hyperparameters: Hyperparameters) -> Self {
    Self {
      dataset,
      hyperparameters,
    }
  }

  #[instrument(
    skip_all,
    fields(
      hidden = self.hyperparameters.hidden_nodes,
      lr = self.hyperparameters.learning_rate
    )
  )]
  pub fn run(&self) -> Result<Outcome> {
    let hp = &self.hyperparameters;
    if hp.batch_size == 0 {
      return Err(Error::InvalidConfiguration("batch_size must be positive".to_string()));
    }
    let target = self
      .dataset
      .target_index(&hp.target)
      .ok_or_else(|| Error::Dataset(format!("unknown target {:?}", hp.target)))?;
    let train = self.dataset.train.with_target(target)?;
    let validation = self.dataset.validation.with_target(target)?;
    let test = self.dataset.test.with_target(target)?;

    let mut rng = match hp.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let mut network = NeuralNetwork::with_rng(
      train.features.ncols(),
      hp.hidden_nodes,
      1,
      hp.learning_rate,
      &mut rng,
    )?;

    let mut losses = Losses::default();
    let start = std::time::Instant::now();
    for ii in 0..hp.iterations {
      let rows = sample_batch(&mut rng, train.len(), hp.batch_size)?;
      let batch = train.select(&rows);
      network.train(batch.features.view(), batch.targets.view())?;

      let train_loss = split_loss(&network, &train)?;
      let validation_loss = split_loss(&network, &validation)?;
      losses.train.push(train_loss);
      losses.validation.push(validation_loss);

      if hp.log_every > 0 && (ii + 1) % hp.log_every == 0 {
        info!(
          "Progress: {:2.1}% ... Training loss: {:.3} ... Validation loss: {:.3}",
          100.0 * (ii + 1) as f64 / hp.iterations as f64,
          train_loss,
          validation_loss
        );
      }
    }

    if hp.iterations > 0 {
      let elapsed = start.elapsed();
      info!("Finished in {} iterations", hp.iterations);
      info!(
        "Took {:.2}s, {:.2}µs / iter",
        elapsed.as_secs_f32(),
        elapsed.as_micros() / hp.iterations as u128
      );
    }

    let test_predictions = network.run(test.features.view())?;
    let test_loss = mse(test_predictions.view(), test.targets.view())?;
    let scaling = self.dataset.scaler.get(&hp.target);
    let restore = |value: f64| scaling.map_or(value, |scaling| scaling.unscale(value));
    let predictions = test_predictions.iter().copied().map(restore).collect();
    let actuals = test.targets.iter().copied().map(restore).collect();
    info!("Test loss: {:.4}", test_loss);

    Ok(Outcome {
      hyperparameters: hp.clone(),
      network,
      losses,
      test_loss,
      predictions,
      actuals,
      dates: self.dataset.test_dates.clone(),
    })
  }
}

fn split_loss(network: &NeuralNetwork, split: &Split) -> Result<f64> {
  let predictions = network.run(split.features.view())?;
  mse(predictions.view(), split.targets.view())
}

/// Row indices drawn uniformly with replacement.
pub fn sample_batch<R: Rng + ?Sized>(
  rng: &mut R,
  n_rows: usize,
  batch_size: usize,
) -> Result<Vec<usize>> {
  if n_rows == 0 {
    return Err(Error::Dataset("cannot sample a batch from an empty split".to_string()));
  }
  Ok((0..batch_size).map(|_| rng.gen_range(0..n_rows)).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
  pub hidden_nodes: usize,
  pub learning_rate: f64,
  pub train_loss: f64,
  pub validation_loss: f64,
}

/// Runs one experiment per (hidden nodes, learning rate) pair and ranks them by final
/// validation loss.
pub fn sweep(
  dataset: &Dataset,
  base: &Hyperparameters,
  hidden_grid: &[usize],
  learning_rate_grid: &[f64],
) -> Result<Vec<SweepResult>> {
  if hidden_grid.is_empty() || learning_rate_grid.is_empty() {
    return Err(Error::InvalidConfiguration("sweep grid is empty".to_string()));
  }
  let mut results = Vec::with_capacity(hidden_grid.len() * learning_rate_grid.len());
  for (&hidden_nodes, &learning_rate) in iproduct!(hidden_grid, learning_rate_grid) {
    let hyperparameters = Hyperparameters {
      hidden_nodes,
      learning_rate,
      ..base.clone()
    };
    let outcome = Experiment::new(dataset, hyperparameters).run()?;
    let result = SweepResult {
      hidden_nodes,
      learning_rate,
      train_loss: outcome.losses.final_train().unwrap_or(f64::NAN),
      validation_loss: outcome.losses.final_validation().unwrap_or(f64::NAN),
    };
    debug!(?result, "sweep point done");
    results.push(result);
  }
  results.sort_by(|a, b| a.validation_loss.total_cmp(&b.validation_loss));
  Ok(results)
}
