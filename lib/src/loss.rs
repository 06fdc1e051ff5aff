use ndarray::ArrayView2;

use crate::{Error, Result};

/// Mean squared error over every element of two equally shaped matrices.
pub fn mse(predictions: ArrayView2<f64>, targets: ArrayView2<f64>) -> Result<f64> {
  if predictions.nrows() != targets.nrows() {
    return Err(Error::mismatch("loss rows", targets.nrows(), predictions.nrows()));
  }
  if predictions.ncols() != targets.ncols() {
    return Err(Error::mismatch("loss columns", targets.ncols(), predictions.ncols()));
  }
  Ok(mean_squared(predictions.iter().zip(targets.iter())))
}

fn mean_squared<'a>(pairs: impl Iterator<Item = (&'a f64, &'a f64)>) -> f64 {
  let (sum, count) = pairs.fold((0.0, 0usize), |(sum, count), (p, t)| {
    (sum + (t - p).powi(2), count + 1)
  });
  if count == 0 {
    0.0
  } else {
    sum / count as f64
  }
}

#[cfg(test)]
mod tests {
  use ndarray::{array, Array2};
  use proptest::prelude::*;

  use super::mse;

  #[test]
  fn test_mse_known_value() {
    let predictions = array![[1.0, 2.0], [3.0, 4.0]];
    let targets = array![[1.0, 0.0], [3.0, 8.0]];
    let loss = mse(predictions.view(), targets.view()).unwrap();
    assert!((loss - 5.0).abs() < 1e-12);
  }

  #[test]
  fn test_mse_shape_mismatch() {
    assert!(mse(array![[1.0, 2.0]].view(), array![[1.0], [2.0]].view()).is_err());
  }

  #[test]
  fn test_mse_empty() {
    let empty = Array2::<f64>::zeros((0, 1));
    assert_eq!(mse(empty.view(), empty.view()).unwrap(), 0.0);
  }

  proptest! {
    #[test]
    fn test_mse_symmetric_and_non_negative(
      a in prop::collection::vec(-1e3f64..1e3, 6),
      b in prop::collection::vec(-1e3f64..1e3, 6),
    ) {
      let a = Array2::from_shape_vec((3, 2), a).unwrap();
      let b = Array2::from_shape_vec((3, 2), b).unwrap();
      let ab = mse(a.view(), b.view()).unwrap();
      let ba = mse(b.view(), a.view()).unwrap();
      prop_assert!(ab >= 0.0);
      prop_assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0));
      prop_assert_eq!(mse(a.view(), a.view()).unwrap(), 0.0);
    }
  }
}
