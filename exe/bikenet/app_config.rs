use std::path::{Path, PathBuf};

use bikenet::Hyperparameters;
use serde::Deserialize;

/// Run settings. Also defines the config file format (every field can be omitted).
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Path of the hourly rides CSV
  pub data: Option<PathBuf>,
  pub iterations: Option<usize>,
  pub learning_rate: Option<f64>,
  pub hidden_nodes: Option<usize>,
  pub batch_size: Option<usize>,
  pub seed: Option<u64>,
  pub log_every: Option<usize>,
  /// Where to write the JSON report
  pub report: Option<PathBuf>,
}

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      data: other.data.or(self.data),
      iterations: other.iterations.or(self.iterations),
      learning_rate: other.learning_rate.or(self.learning_rate),
      hidden_nodes: other.hidden_nodes.or(self.hidden_nodes),
      batch_size: other.batch_size.or(self.batch_size),
      seed: other.seed.or(self.seed),
      log_every: other.log_every.or(self.log_every),
      report: other.report.or(self.report),
    }
  }

  /// Fills whatever is unset from the defaults.
  pub fn hyperparameters(&self) -> Hyperparameters {
    let defaults = Hyperparameters::default();
    Hyperparameters {
      iterations: self.iterations.unwrap_or(defaults.iterations),
      learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
      hidden_nodes: self.hidden_nodes.unwrap_or(defaults.hidden_nodes),
      batch_size: self.batch_size.unwrap_or(defaults.batch_size),
      seed: self.seed.or(defaults.seed),
      log_every: self.log_every.unwrap_or(defaults.log_every),
      ..defaults
    }
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::AppConfig;

  #[test]
  fn test_partial_yaml() {
    let config: AppConfig = serde_yaml::from_str("hidden_nodes: 20\nseed: 4\n").unwrap();
    assert_eq!(config.hidden_nodes, Some(20));
    assert_eq!(config.iterations, None);
    let hp = config.hyperparameters();
    assert_eq!(hp.hidden_nodes, 20);
    assert_eq!(hp.seed, Some(4));
    assert_eq!(hp.iterations, 1000);
  }

  #[test]
  fn test_unknown_key_is_rejected() {
    assert!(serde_yaml::from_str::<AppConfig>("hiden_nodes: 20\n").is_err());
  }

  #[test]
  fn test_merge_prefers_second() {
    let file = AppConfig {
      data: Some(PathBuf::from("hour.csv")),
      learning_rate: Some(0.1),
      ..Default::default()
    };
    let cli = AppConfig {
      learning_rate: Some(0.6),
      ..Default::default()
    };
    let merged = file.merge(cli);
    assert_eq!(merged.learning_rate, Some(0.6));
    assert_eq!(merged.data, Some(PathBuf::from("hour.csv")));
  }
}
