use anyhow::Result;
use clap::Parser;
use rulebatch::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "RULEBATCH_LOG";

fn main() -> Result<()> {
    // handle broken pipe gracefully (e.g., when piping to `head` or `jq` that exits early)
    reset_sigpipe();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    cli::run(cli)
}

/// log to stderr so stdout stays parseable; RULEBATCH_LOG overrides the level
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// reset SIGPIPE to default behavior (terminate process) instead of panicking
/// this is the standard Unix behavior for CLI tools
fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
