mod app_config;

use std::{error::Error, path::PathBuf};

use app_config::AppConfig;
use bikenet::{
  data::{read_rides, Dataset, SplitSizes},
  experiment::sweep,
  report::Report,
  utils, Experiment,
};
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Args)]
struct RunArgs {
  /// Hourly rides CSV (hour.csv of the bike sharing dataset)
  #[arg(short, long, value_name = "PATH")]
  data: Option<PathBuf>,
  /// YAML file with run settings, flags take precedence
  #[arg(short, long, value_name = "PATH")]
  config: Option<PathBuf>,
  #[arg(long, value_name = "INT")]
  iterations: Option<usize>,
  #[arg(long, value_name = "INT")]
  batch_size: Option<usize>,
  #[arg(long, value_name = "INT")]
  seed: Option<u64>,
  #[arg(long, value_name = "INT")]
  log_every: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
  /// Train once and evaluate on the held out days
  Train {
    #[command(flatten)]
    run: RunArgs,
    #[arg(long, value_name = "FLOAT")]
    learning_rate: Option<f64>,
    #[arg(long, value_name = "INT")]
    hidden_nodes: Option<usize>,
    /// Write losses and test predictions as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
  },
  /// Train once per combination of hidden nodes and learning rate, ranked by validation loss
  Sweep {
    #[command(flatten)]
    run: RunArgs,
    #[arg(long, value_name = "INT,..", value_delimiter = ',', required = true)]
    hidden: Vec<usize>,
    #[arg(long = "learning-rate", value_name = "FLOAT,..", value_delimiter = ',', required = true)]
    learning_rates: Vec<f64>,
  },
}

/// Config file first, then the flags on top.
fn resolve(run: RunArgs, flags: AppConfig) -> Result<AppConfig, Box<dyn Error>> {
  let file = match &run.config {
    Some(path) => AppConfig::from_file(path)?,
    None => AppConfig::default(),
  };
  let cli = AppConfig {
    data: run.data,
    iterations: run.iterations,
    batch_size: run.batch_size,
    seed: run.seed,
    log_every: run.log_every,
    ..flags
  };
  Ok(file.merge(cli))
}

fn load_dataset(config: &AppConfig) -> Result<Dataset, Box<dyn Error>> {
  let path = config
    .data
    .as_deref()
    .ok_or("no rides file given, pass --data or set `data` in the config")?;
  let rides = read_rides(path)?;
  Ok(Dataset::prepare(rides, SplitSizes::default())?)
}

fn main() -> Result<(), Box<dyn Error>> {
  utils::init_logging()?;
  let args = Cli::parse();

  match args.command {
    Command::Train {
      run,
      learning_rate,
      hidden_nodes,
      report,
    } => {
      let flags = AppConfig {
        learning_rate,
        hidden_nodes,
        report,
        ..Default::default()
      };
      let config = resolve(run, flags)?;
      let dataset = load_dataset(&config)?;
      let hyperparameters = config.hyperparameters();
      info!("{:?}", hyperparameters);

      let outcome = Experiment::new(&dataset, hyperparameters).run()?;
      info!(
        "Training loss: {:.3} ... Validation loss: {:.3} ... Test loss: {:.3}",
        outcome.losses.final_train().unwrap_or(f64::NAN),
        outcome.losses.final_validation().unwrap_or(f64::NAN),
        outcome.test_loss
      );
      if let Some(path) = &config.report {
        Report::from_outcome(&outcome).write_json(path)?;
      }
    }
    Command::Sweep {
      run,
      hidden,
      learning_rates,
    } => {
      let config = resolve(run, AppConfig::default())?;
      let dataset = load_dataset(&config)?;
      let results = sweep(&dataset, &config.hyperparameters(), &hidden, &learning_rates)?;
      for (rank, result) in results.iter().enumerate() {
        info!(
          "#{} hidden_nodes={} learning_rate={} ... Training loss: {:.3} ... \
           Validation loss: {:.3}",
          rank + 1,
          result.hidden_nodes,
          result.learning_rate,
          result.train_loss,
          result.validation_loss
        );
      }
    }
  }
  Ok(())
}
