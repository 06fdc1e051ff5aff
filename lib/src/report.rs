use std::path::Path;

use itertools::izip;
use serde::Serialize;
use tracing::info;

use crate::{
  experiment::{Hyperparameters, Losses, Outcome},
  Result,
};

/// What a finished run leaves behind: loss curves and the test predictions next to the real counts.
/// Weights are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
  pub hyperparameters: Hyperparameters,
  pub losses: Losses,
  pub test_loss: f64,
  pub test: Vec<TestRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRow {
  /// Missing when the rides table had no dates.
  pub date: Option<String>,
  pub prediction: f64,
  pub actual: f64,
}

impl Report {
  pub fn from_outcome(outcome: &Outcome) -> Self {
    let dates = outcome
      .dates
      .iter()
      .cloned()
      .map(Some)
      .chain(std::iter::repeat(None));
    let test = izip!(dates, &outcome.predictions, &outcome.actuals)
      .map(|(date, &prediction, &actual)| TestRow {
        date,
        prediction,
        actual,
      })
      .collect();
    Self {
      hyperparameters: outcome.hyperparameters.clone(),
      losses: outcome.losses.clone(),
      test_loss: outcome.test_loss,
      test,
    }
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn write_json(&self, path: &Path) -> Result<()> {
    std::fs::write(path, self.to_json()?)?;
    info!("Report written to {:?}", path);
    Ok(())
  }
}
