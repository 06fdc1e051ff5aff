//! The network: one hidden layer (sigmoid by default), linear output, plain gradient descent.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::{Error, Result};

pub fn sigmoid(x: f64) -> f64 {
  1.0 / (1.0 + (-x).exp())
}

/// Element-wise activation of the hidden layer together with its derivative.
///
/// The derivative takes the activation's *output*, the only value the backward pass keeps.
#[derive(Debug, Clone, Copy)]
pub struct Activation {
  pub function: fn(f64) -> f64,
  pub derivative: fn(f64) -> f64,
}

impl Activation {
  pub const SIGMOID: Activation = Activation {
    function: sigmoid,
    derivative: sigmoid_derivative,
  };

  pub const IDENTITY: Activation = Activation {
    function: identity,
    derivative: unit,
  };

  pub const TANH: Activation = Activation {
    function: f64::tanh,
    derivative: tanh_derivative,
  };

  pub fn new(function: fn(f64) -> f64, derivative: fn(f64) -> f64) -> Self {
    Self {
      function,
      derivative,
    }
  }
}

fn sigmoid_derivative(h: f64) -> f64 {
  h * (1.0 - h)
}

fn tanh_derivative(h: f64) -> f64 {
  1.0 - h * h
}

fn identity(x: f64) -> f64 {
  x
}

fn unit(_: f64) -> f64 {
  1.0
}

impl Default for Activation {
  fn default() -> Self {
    Activation::SIGMOID
  }
}

#[derive(Debug, Clone)]
pub struct NeuralNetwork {
  input_nodes: usize,
  hidden_nodes: usize,
  output_nodes: usize,
  learning_rate: f64,
  /// (input_nodes, hidden_nodes)
  weights_input_to_hidden: Array2<f64>,
  /// (hidden_nodes, output_nodes)
  weights_hidden_to_output: Array2<f64>,
  activation: Activation,
}

impl NeuralNetwork {
  /// Random initialisation from the thread rng. See [`NeuralNetwork::with_rng`].
  pub fn new(
    input_nodes: usize,
    hidden_nodes: usize,
    output_nodes: usize,
    learning_rate: f64,
  ) -> Result<Self> {
    Self::with_rng(
      input_nodes,
      hidden_nodes,
      output_nodes,
      learning_rate,
      &mut rand::thread_rng(),
    )
  }

  /// Weights are drawn from N(0, fan_in^-0.5), fan_in being the node count of the layer
  /// feeding them.
  pub fn with_rng<R: Rng + ?Sized>(
    input_nodes: usize,
    hidden_nodes: usize,
    output_nodes: usize,
    learning_rate: f64,
    rng: &mut R,
  ) -> Result<Self> {
    check_config(input_nodes, hidden_nodes, output_nodes, learning_rate)?;
    let weights_input_to_hidden = normal_matrix(input_nodes, hidden_nodes, input_nodes, rng)?;
    let weights_hidden_to_output = normal_matrix(hidden_nodes, output_nodes, hidden_nodes, rng)?;
    Ok(Self {
      input_nodes,
      hidden_nodes,
      output_nodes,
      learning_rate,
      weights_input_to_hidden,
      weights_hidden_to_output,
      activation: Activation::SIGMOID,
    })
  }

  /// Builds a network around known weights. The node counts are read off the matrix shapes.
  pub fn with_weights(
    weights_input_to_hidden: Array2<f64>,
    weights_hidden_to_output: Array2<f64>,
    learning_rate: f64,
  ) -> Result<Self> {
    let (input_nodes, hidden_nodes) = weights_input_to_hidden.dim();
    let (hidden_rows, output_nodes) = weights_hidden_to_output.dim();
    if hidden_nodes != hidden_rows {
      return Err(Error::InvalidConfiguration(format!(
        "input-to-hidden weights have {} columns but hidden-to-output weights have {} rows",
        hidden_nodes, hidden_rows
      )));
    }
    check_config(input_nodes, hidden_nodes, output_nodes, learning_rate)?;
    Ok(Self {
      input_nodes,
      hidden_nodes,
      output_nodes,
      learning_rate,
      weights_input_to_hidden,
      weights_hidden_to_output,
      activation: Activation::SIGMOID,
    })
  }

  /// Swaps the hidden activation. `train` follows with the derivative stored alongside.
  pub fn with_activation(mut self, activation: Activation) -> Self {
    self.activation = activation;
    self
  }

  pub fn activation_function(&self, x: f64) -> f64 {
    (self.activation.function)(x)
  }

  pub fn input_nodes(&self) -> usize {
    self.input_nodes
  }

  pub fn hidden_nodes(&self) -> usize {
    self.hidden_nodes
  }

  pub fn output_nodes(&self) -> usize {
    self.output_nodes
  }

  pub fn learning_rate(&self) -> f64 {
    self.learning_rate
  }

  pub fn weights_input_to_hidden(&self) -> &Array2<f64> {
    &self.weights_input_to_hidden
  }

  pub fn weights_hidden_to_output(&self) -> &Array2<f64> {
    &self.weights_hidden_to_output
  }

  /// Replaces both weight matrices. Their shapes must equal the current ones.
  pub fn set_weights(
    &mut self,
    weights_input_to_hidden: Array2<f64>,
    weights_hidden_to_output: Array2<f64>,
  ) -> Result<()> {
    check_shape(
      "input-to-hidden weights",
      self.weights_input_to_hidden.dim(),
      weights_input_to_hidden.dim(),
    )?;
    check_shape(
      "hidden-to-output weights",
      self.weights_hidden_to_output.dim(),
      weights_hidden_to_output.dim(),
    )?;
    self.weights_input_to_hidden = weights_input_to_hidden;
    self.weights_hidden_to_output = weights_hidden_to_output;
    Ok(())
  }

  /// Forward pass over a batch, one sample per row. Returns (n_samples, output_nodes).
  pub fn run(&self, features: ArrayView2<f64>) -> Result<Array2<f64>> {
    if features.ncols() != self.input_nodes {
      return Err(Error::mismatch("feature columns", self.input_nodes, features.ncols()));
    }
    let hidden_outputs = features
      .dot(&self.weights_input_to_hidden)
      .mapv(self.activation.function);
    Ok(hidden_outputs.dot(&self.weights_hidden_to_output))
  }

  /// Forward pass of a single sample.
  pub fn run_one(&self, features: ArrayView1<f64>) -> Result<Array1<f64>> {
    let outputs = self.run(features.insert_axis(Axis(0)))?;
    Ok(outputs.row(0).to_owned())
  }

  /// One gradient step averaged over every row of the batch.
  ///
  /// The error is `target - prediction`, hence the update adds to the weights.
  /// Shapes are checked up front so a rejected batch leaves the weights untouched.
  pub fn train(&mut self, features: ArrayView2<f64>, targets: ArrayView2<f64>) -> Result<()> {
    if features.ncols() != self.input_nodes {
      return Err(Error::mismatch("feature columns", self.input_nodes, features.ncols()));
    }
    if targets.ncols() != self.output_nodes {
      return Err(Error::mismatch("target columns", self.output_nodes, targets.ncols()));
    }
    if features.nrows() != targets.nrows() {
      return Err(Error::mismatch("target rows", features.nrows(), targets.nrows()));
    }
    let n_records = features.nrows();
    if n_records == 0 {
      return Ok(());
    }

    let mut delta_weights_i_h = Array2::<f64>::zeros(self.weights_input_to_hidden.raw_dim());
    let mut delta_weights_h_o = Array2::<f64>::zeros(self.weights_hidden_to_output.raw_dim());
    for (x, y) in features.outer_iter().zip(targets.outer_iter()) {
      let hidden_outputs = x
        .dot(&self.weights_input_to_hidden)
        .mapv(self.activation.function);
      let final_outputs = hidden_outputs.dot(&self.weights_hidden_to_output);

      // linear output: the output error term is the error itself
      let error = &y - &final_outputs;
      let hidden_error = self.weights_hidden_to_output.dot(&error);
      let hidden_error_term = hidden_error * &hidden_outputs.mapv(self.activation.derivative);

      delta_weights_h_o += &outer(hidden_outputs.view(), error.view());
      delta_weights_i_h += &outer(x, hidden_error_term.view());
    }

    let step = self.learning_rate / n_records as f64;
    self
      .weights_hidden_to_output
      .scaled_add(step, &delta_weights_h_o);
    self
      .weights_input_to_hidden
      .scaled_add(step, &delta_weights_i_h);
    trace!(n_records, step, "applied weight update");
    Ok(())
  }
}

fn check_config(
  input_nodes: usize,
  hidden_nodes: usize,
  output_nodes: usize,
  learning_rate: f64,
) -> Result<()> {
  for (name, count) in [
    ("input_nodes", input_nodes),
    ("hidden_nodes", hidden_nodes),
    ("output_nodes", output_nodes),
  ] {
    if count == 0 {
      return Err(Error::InvalidConfiguration(format!("{} must be positive", name)));
    }
  }
  if !(learning_rate > 0.0 && learning_rate.is_finite()) {
    return Err(Error::InvalidConfiguration(format!(
      "learning_rate must be positive and finite, got {}",
      learning_rate
    )));
  }
  Ok(())
}

fn check_shape(
  context: &'static str,
  expected: (usize, usize),
  found: (usize, usize),
) -> Result<()> {
  if expected.0 != found.0 {
    return Err(Error::mismatch(context, expected.0, found.0));
  }
  if expected.1 != found.1 {
    return Err(Error::mismatch(context, expected.1, found.1));
  }
  Ok(())
}

fn normal_matrix<R: Rng + ?Sized>(
  rows: usize,
  cols: usize,
  fan_in: usize,
  rng: &mut R,
) -> Result<Array2<f64>> {
  let normal = Normal::new(0.0, (fan_in as f64).powf(-0.5))
    .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
  Ok(Array2::from_shape_fn((rows, cols), |_| normal.sample(&mut *rng)))
}

fn outer(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Array2<f64> {
  let column = a.insert_axis(Axis(1));
  let row = b.insert_axis(Axis(0));
  column.dot(&row)
}
