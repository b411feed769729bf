use std::io::IsTerminal;

use clap::{builder::ArgAction, Parser};
use console::{style, Emoji};
use errors::SetupErrors;
use paperless_provision::{
  command::SystemExecutor, dispatcher::Dispatcher, paths::SystemPaths, Context,
};
use prompt::{DialoguerPrompt, LinePrompt};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod errors;
pub mod prompt;

static CROSS: Emoji<'_, '_> = Emoji("❌ ", "error: ");

#[derive(Parser)]
#[command(
  author,
  version,
  about = "Install Paperless-ngx on this host, or manage the existing installation",
  long_about = "Run as root. Without an installation record (./paperless-ngx.install) it asks a \
                few questions and installs Paperless-ngx with PostgreSQL, Redis and systemd \
                services. With a record it offers a menu to check, start, stop, update or \
                remove the installation."
)]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

fn run() -> Result<(), SetupErrors> {
  let paths = SystemPaths::default();
  debug!("Installation record: {}", std::env::current_dir()?.join(&paths.record).display());

  let privileged = nix::unistd::geteuid().is_root();
  let ctx = Context::new(&SystemExecutor, &paths);
  let outcome = if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
    Dispatcher::new(ctx, &DialoguerPrompt, privileged).run()?
  } else {
    debug!("Standard input is not a terminal; reading answers line by line");
    Dispatcher::new(ctx, &LinePrompt::new(std::io::stdin().lock()), privileged).run()?
  };
  debug!("Finished with {outcome:?}");
  Ok(())
}

fn main() {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  if let Err(e) = run() {
    eprintln!("{} {}", style(CROSS).red(), style(&e).red());
    std::process::exit(1);
  }
}
