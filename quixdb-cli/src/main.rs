use anyhow::Result;
use clap::Parser;
use log::info;

use quixdb_cli::command::{self, Command};
use quixdb_cli::config::Config;
use quixdb_cli::trace;

#[derive(Debug, Parser)]
#[command(name = "quixdb", version, author, about = "QuixDB command-line client")]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    #[clap(short = 'l', long, default_value = "info", help = "log level filter")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load();

    let log_dir =
        format!("{}/.quixdb-cli", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guards = trace::init_logging(&log_dir, &args.log_level)?;
    info!("quixdb-cli starting: {:?}", args);

    command::run(args.cmd, &config)
}
