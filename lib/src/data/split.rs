use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{one_hot, Frame, Scaler, DUMMY_FIELDS, FIELDS_TO_DROP, QUANT_FEATURES};
use crate::{Error, Result};

/// Predicted columns, in output order. Every other column is a feature.
pub const TARGET_FIELDS: [&str; 3] = ["cnt", "casual", "registered"];

/// Roughly the last 21 days.
pub const TEST_ROWS: usize = 21 * 24;
/// Roughly the 60 days preceding the test set.
pub const VALIDATION_ROWS: usize = 60 * 24;

/// Row-aligned features and targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
  pub features: Array2<f64>,
  pub targets: Array2<f64>,
}

impl Split {
  pub fn len(&self) -> usize {
    self.features.nrows()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Copies the given rows, repeats allowed.
  pub fn select(&self, rows: &[usize]) -> Split {
    Split {
      features: self.features.select(Axis(0), rows),
      targets: self.targets.select(Axis(0), rows),
    }
  }

  /// Keeps a single target column, as a (rows, 1) matrix.
  pub fn with_target(&self, column: usize) -> Result<Split> {
    if column >= self.targets.ncols() {
      return Err(Error::mismatch("target column", column + 1, self.targets.ncols()));
    }
    Ok(Split {
      features: self.features.clone(),
      targets: self.targets.select(Axis(1), &[column]),
    })
  }
}

/// Rows held back at the end of the table, newest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
  pub test: usize,
  pub validation: usize,
}

impl Default for SplitSizes {
  fn default() -> Self {
    Self {
      test: TEST_ROWS,
      validation: VALIDATION_ROWS,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Dataset {
  pub train: Split,
  pub validation: Split,
  pub test: Split,
  pub feature_names: Vec<String>,
  pub target_names: Vec<String>,
  pub scaler: Scaler,
  /// Dates of the test rows, empty if the table had none.
  pub test_dates: Vec<String>,
}

impl Dataset {
  /// Full preparation of raw rides: indicators, dropped columns, standardisation, then the split.
  pub fn prepare(mut rides: Frame, sizes: SplitSizes) -> Result<Self> {
    one_hot(&mut rides, &DUMMY_FIELDS)?;
    rides.drop_columns(&FIELDS_TO_DROP);
    let scaler = Scaler::fit_transform(&mut rides, &QUANT_FEATURES)?;
    Self::split(&rides, &TARGET_FIELDS, scaler, sizes)
  }

  /// Splits an already prepared table chronologically into train, validation and test.
  pub fn split(
    frame: &Frame,
    targets: &[&str],
    scaler: Scaler,
    sizes: SplitSizes,
  ) -> Result<Self> {
    let rows = frame.len();
    let held_back = sizes.test + sizes.validation;
    if rows <= held_back {
      return Err(Error::Dataset(format!(
        "{} rows leave nothing to train on after holding back {} for test and {} for validation",
        rows, sizes.test, sizes.validation
      )));
    }
    let target_names: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    for name in &target_names {
      if !frame.has_column(name) {
        return Err(Error::Dataset(format!("target column {:?} is missing", name)));
      }
    }
    let feature_names: Vec<String> = frame
      .columns()
      .iter()
      .filter(|column| !target_names.contains(column))
      .cloned()
      .collect();
    if feature_names.is_empty() {
      return Err(Error::Dataset("no feature columns left".to_string()));
    }

    let test_start = rows - sizes.test;
    let validation_start = test_start - sizes.validation;
    let split = |range: std::ops::Range<usize>| -> Result<Split> {
      Ok(Split {
        features: frame.to_array(&feature_names, range.clone())?,
        targets: frame.to_array(&target_names, range)?,
      })
    };
    let train = split(0..validation_start)?;
    let validation = split(validation_start..test_start)?;
    let test = split(test_start..rows)?;
    let test_dates = frame
      .dates()
      .get(test_start..)
      .map(<[String]>::to_vec)
      .unwrap_or_default();

    info!(
      "train: {:?} features, {:?} targets; validation: {} rows; test: {} rows",
      train.features.dim(),
      train.targets.dim(),
      validation.len(),
      test.len()
    );
    Ok(Self {
      train,
      validation,
      test,
      feature_names,
      target_names,
      scaler,
      test_dates,
    })
  }

  pub fn target_index(&self, name: &str) -> Option<usize> {
    self.target_names.iter().position(|target| target == name)
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::{Dataset, SplitSizes};
  use crate::data::{parse_rides, Frame, Scaler};
  use crate::Error;

  fn numbered_frame(rows: usize) -> Frame {
    let mut frame = Frame::new(rows);
    frame
      .push_column("x", (0..rows).map(|i| i as f64).collect())
      .unwrap();
    frame
      .push_column("cnt", (0..rows).map(|i| 10.0 * i as f64).collect())
      .unwrap();
    frame
      .set_dates((0..rows).map(|i| format!("day-{}", i)).collect())
      .unwrap();
    frame
  }

  #[test]
  fn test_split_is_chronological() {
    let sizes = SplitSizes {
      test: 2,
      validation: 3,
    };
    let dataset = Dataset::split(&numbered_frame(10), &["cnt"], Scaler::default(), sizes).unwrap();
    assert_eq!(dataset.feature_names, ["x"]);
    assert_eq!(dataset.train.len(), 5);
    assert_eq!(dataset.validation.features, array![[5.0], [6.0], [7.0]]);
    assert_eq!(dataset.test.targets, array![[80.0], [90.0]]);
    assert_eq!(dataset.test_dates, ["day-8", "day-9"]);
    assert_eq!(dataset.target_index("cnt"), Some(0));
  }

  #[test]
  fn test_split_needs_training_rows() {
    let sizes = SplitSizes {
      test: 2,
      validation: 3,
    };
    let result = Dataset::split(&numbered_frame(5), &["cnt"], Scaler::default(), sizes);
    assert!(matches!(result, Err(Error::Dataset(_))));
  }

  #[test]
  fn test_select_repeats_rows() {
    let sizes = SplitSizes {
      test: 1,
      validation: 1,
    };
    let dataset = Dataset::split(&numbered_frame(6), &["cnt"], Scaler::default(), sizes).unwrap();
    let batch = dataset.train.select(&[3, 3, 0]);
    assert_eq!(batch.features, array![[3.0], [3.0], [0.0]]);
    assert_eq!(batch.targets, array![[30.0], [30.0], [0.0]]);
  }

  #[test]
  fn test_prepare_rides() {
    let csv = "\
instant,dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,\
temp,atemp,hum,windspeed,casual,registered,cnt
1,2011-01-01,1,0,1,0,0,6,0,1,0.24,0.2879,0.81,0,3,13,16
2,2011-01-01,1,0,1,1,0,6,0,1,0.22,0.2727,0.8,0,8,32,40
3,2011-01-01,1,0,1,2,0,6,0,2,0.22,0.2727,0.8,0,5,27,32
4,2011-01-01,1,0,1,3,0,6,0,1,0.24,0.2879,0.75,0,3,10,13
";
    let rides = parse_rides(csv.as_bytes()).unwrap();
    let sizes = SplitSizes {
      test: 1,
      validation: 1,
    };
    let dataset = Dataset::prepare(rides, sizes).unwrap();
    assert_eq!(dataset.target_names, ["cnt", "casual", "registered"]);
    assert_eq!(
      dataset.feature_names,
      [
        "yr",
        "holiday",
        "temp",
        "hum",
        "windspeed",
        "season_1",
        "weathersit_1",
        "weathersit_2",
        "mnth_1",
        "hr_0",
        "hr_1",
        "hr_2",
        "hr_3",
        "weekday_6"
      ]
    );
    assert_eq!(dataset.train.features.dim(), (2, 14));
    assert_eq!(dataset.test.targets.dim(), (1, 3));
    let cnt = dataset.scaler.get("cnt").unwrap();
    assert!((cnt.mean - 25.25).abs() < 1e-12);
    assert!((cnt.unscale(dataset.test.targets[[0, 0]]) - 13.0).abs() < 1e-9);
    assert_eq!(dataset.test_dates, ["2011-01-01"]);
  }
}
