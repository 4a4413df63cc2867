//! callpath CLI - explore call graphs with path regular expressions.
//!
//! Usage:
//!   callpath graph.txt queries.txt     # run scripts in order
//!   callpath < commands.txt            # read commands from stdin
//!   callpath --keep-going script.txt   # report failing lines and continue

use anyhow::{bail, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use callpath::config::{CallpathConfig, DEFAULT_CONFIG_FILE};
use callpath::Session;

#[derive(Parser)]
#[command(name = "callpath")]
#[command(about = "callpath - explore call graphs with path regular expressions", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Keep running after a command fails
    #[arg(short, long)]
    keep_going: bool,

    /// Command scripts to run in order (default: read stdin)
    scripts: Vec<PathBuf>,
}

fn main() {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CallpathConfig::load(&cli.config);
    if cli.keep_going {
        config.session.stop_on_error = false;
    }

    let mut session = Session::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut failures = 0;
    if cli.scripts.is_empty() {
        failures += session.run_script(io::stdin().lock(), &mut out)?;
    } else {
        for script in &cli.scripts {
            failures += session.source(script, &mut out)?;
        }
    }
    out.flush()?;

    info!(stats = %session.graph().stats(), "session finished");
    if failures > 0 {
        bail!("{} command(s) failed", failures);
    }
    Ok(())
}
