mod application;
mod cli;

use anyhow::{
  Context,
  Result,
};
use the_transformer_loader::config::Config;

use crate::{
  application::Application,
  cli::CliOptions,
};

fn setup_logging(verbosity: u8) -> Result<()> {
  let mut base_config = fern::Dispatch::new();

  base_config = match verbosity {
    0 => base_config.level(log::LevelFilter::Warn),
    1 => base_config.level(log::LevelFilter::Info),
    2 => base_config.level(log::LevelFilter::Debug),
    _ => base_config.level(log::LevelFilter::Trace),
  };

  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(the_transformer_loader::log_file())?);

  base_config.chain(file_config).apply()?;

  Ok(())
}

fn main() -> Result<()> {
  let exit_code = main_impl()?;
  std::process::exit(exit_code);
}

#[tokio::main]
async fn main_impl() -> Result<i32> {
  let opts = CliOptions::parse()?;

  if opts.list {
    print!("{}", application::catalog());
    return Ok(0);
  }

  the_transformer_loader::initialize_config_file(opts.config_file.clone());
  the_transformer_loader::initialize_log_file(opts.log_file.clone());

  setup_logging(opts.verbosity).context("failed to initialize logging")?;

  let config = match opts.config_file {
    Some(ref path) => Config::load(path),
    None => Config::load_default(),
  }
  .context("could not load configuration")?;
  log::debug!("configuration: {config:?}");

  let mut app = Application::new(&config, &opts)?;
  if opts.interactive {
    app.run_interactive(&opts).await?;
  } else {
    app.run_batch(&opts).await?;
  }

  Ok(0)
}
