use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Frame;
use crate::Result;

/// Categorical columns expanded into indicator columns.
pub const DUMMY_FIELDS: [&str; 5] = ["season", "weathersit", "mnth", "hr", "weekday"];

/// Columns removed once the indicators exist. Redundant or leaking information.
pub const FIELDS_TO_DROP: [&str; 9] = [
  "instant",
  "dteday",
  "season",
  "weathersit",
  "weekday",
  "atemp",
  "mnth",
  "workingday",
  "hr",
];

/// Continuous columns standardised to zero mean and unit variance.
pub const QUANT_FEATURES: [&str; 6] = ["casual", "registered", "cnt", "temp", "hum", "windspeed"];

/// Appends `<field>_<value>` indicator columns for every distinct value of each field,
/// in ascending order. No level is dropped.
pub fn one_hot(frame: &mut Frame, fields: &[&str]) -> Result<()> {
  for field in fields {
    let column = frame.column(field)?.to_vec();
    let levels: Vec<f64> = column
      .iter()
      .copied()
      .sorted_by(|a, b| a.total_cmp(b))
      .dedup()
      .collect();
    debug!(field, levels = levels.len(), "one-hot encoding");
    for level in levels {
      let indicator = column
        .iter()
        .map(|value| if *value == level { 1.0 } else { 0.0 })
        .collect();
      frame.push_column(format!("{}_{}", field, level), indicator)?;
    }
  }
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
  pub mean: f64,
  pub std: f64,
}

impl Scaling {
  pub fn scale(&self, value: f64) -> f64 {
    (value - self.mean) / self.std
  }

  pub fn unscale(&self, value: f64) -> f64 {
    value * self.std + self.mean
  }
}

/// Remembers the scaling applied to each column so predictions can be mapped back to ride counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
  scalings: BTreeMap<String, Scaling>,
}

impl Scaler {
  /// Standardises the named columns in place with their mean and sample standard deviation.
  /// A constant column is only centred.
  pub fn fit_transform(frame: &mut Frame, fields: &[&str]) -> Result<Self> {
    let mut scalings = BTreeMap::new();
    for field in fields {
      let column = frame.column_mut(field)?;
      let scaling = fit(column);
      column
        .iter_mut()
        .for_each(|value| *value = scaling.scale(*value));
      debug!(field, mean = scaling.mean, std = scaling.std, "scaled");
      scalings.insert(field.to_string(), scaling);
    }
    Ok(Self { scalings })
  }

  pub fn get(&self, field: &str) -> Option<Scaling> {
    self.scalings.get(field).copied()
  }
}

fn fit(values: &[f64]) -> Scaling {
  let n = values.len();
  if n == 0 {
    return Scaling { mean: 0.0, std: 1.0 };
  }
  let mean = values.iter().sum::<f64>() / n as f64;
  if n < 2 {
    return Scaling { mean, std: 1.0 };
  }
  let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
  let std = variance.sqrt();
  if std > 0.0 && std.is_finite() {
    Scaling { mean, std }
  } else {
    Scaling { mean, std: 1.0 }
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::{one_hot, Scaler, Scaling};
  use crate::data::{parse_rides, Frame};

  #[test]
  fn test_one_hot() {
    let csv = "season,hr,cnt\n2,0,1\n1,1,2\n2,1,3\n";
    let mut frame = parse_rides(csv.as_bytes()).unwrap();
    one_hot(&mut frame, &["season", "hr"]).unwrap();
    assert_eq!(
      frame.columns(),
      ["season", "hr", "cnt", "season_1", "season_2", "hr_0", "hr_1"]
    );
    assert_eq!(frame.column("season_1").unwrap(), [0.0, 1.0, 0.0]);
    assert_eq!(frame.column("season_2").unwrap(), [1.0, 0.0, 1.0]);
    assert_eq!(frame.column("hr_1").unwrap(), [0.0, 1.0, 1.0]);
  }

  #[test]
  fn test_one_hot_missing_field() {
    let mut frame = parse_rides("cnt\n1\n".as_bytes()).unwrap();
    assert!(one_hot(&mut frame, &["season"]).is_err());
  }

  #[test]
  fn test_scaler_uses_sample_std() {
    let mut frame = Frame::new(4);
    frame.push_column("cnt", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    frame.push_column("temp", vec![5.0; 4]).unwrap();
    let scaler = Scaler::fit_transform(&mut frame, &["cnt", "temp"]).unwrap();

    let cnt = scaler.get("cnt").unwrap();
    assert!((cnt.mean - 2.5).abs() < 1e-12);
    assert!((cnt.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    let scaled = frame.column("cnt").unwrap();
    assert!((scaled.iter().sum::<f64>()).abs() < 1e-12);

    assert_eq!(scaler.get("temp"), Some(Scaling { mean: 5.0, std: 1.0 }));
    assert_eq!(frame.column("temp").unwrap(), [0.0; 4]);

    assert!((cnt.unscale(scaled[3]) - 4.0).abs() < 1e-12);
    assert!(scaler.get("hum").is_none());
  }

  proptest! {
    #[test]
    fn test_scaling_inverts(mean in -1e3f64..1e3, std in 1e-3f64..1e3, value in -1e4f64..1e4) {
      let scaling = Scaling { mean, std };
      let back = scaling.unscale(scaling.scale(value));
      prop_assert!((back - value).abs() <= 1e-9 * value.abs().max(1.0));
    }
  }
}
