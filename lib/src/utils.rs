#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use tracing::{
  dispatcher::DefaultGuard,
  subscriber::{self, SetGlobalDefaultError},
};

#[cfg(debug_assertions)]
extern crate better_panic;

use tracing_subscriber::{fmt, EnvFilter};

// [NOTE] tracing
//
// Library code logs through `tracing::{trace, debug, info}` and puts
// `#[tracing::instrument]` on the experiment entry points. The level is
// picked from RUST_LOG and defaults to info.

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn install_logger() -> Result<(), SetGlobalDefaultError> {
  let subscriber = fmt().compact().with_env_filter(env_filter()).finish();
  subscriber::set_global_default(subscriber)
}

pub fn init_logging() -> Result<(), SetGlobalDefaultError> {
  // Human Panic. Only enabled when *not* debugging.
  #[cfg(not(debug_assertions))]
  {
    setup_panic!();
  }

  // Better Panic. Only enabled *when* debugging.
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(false)
      .lineno_suffix(true)
      .verbosity(better_panic::Verbosity::Full)
      .install();
  }

  install_logger()?;

  Ok(())
}

/// Thread-local subscriber for tests, writing through the test harness capture.
/// Drop the guard to uninstall.
pub fn init_logging_tests() -> DefaultGuard {
  let subscriber = fmt()
    .compact()
    .with_env_filter(env_filter())
    .with_test_writer()
    .finish();
  subscriber::set_default(subscriber)
}
