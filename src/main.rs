//! pgspawn: run a throwaway PostgreSQL server until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use pgspawn::{Config, PgInstance};

#[derive(Parser, Debug)]
#[command(name = "pgspawn")]
#[command(about = "Start a disposable PostgreSQL server and print its connection URL")]
struct Args {
    /// Directory containing initdb and postgres
    #[arg(long)]
    bin_dir: Option<PathBuf>,

    /// Keep database files in this directory instead of a temporary one
    #[arg(long)]
    dir: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra arguments passed to postgres, after `--`
    #[arg(last = true)]
    postgres_args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .apply_env();
    if let Some(bin_dir) = args.bin_dir {
        config.bin_dir = Some(bin_dir);
    }
    if let Some(dir) = args.dir {
        config.dir = Some(dir);
    }
    if !args.postgres_args.is_empty() {
        config.additional_args = args.postgres_args;
    }

    let instance = PgInstance::start(&config).await?;
    println!("{}", instance.connection_url());
    println!("host: {}", instance.host().display());
    log::info!("Press Ctrl-C to stop");

    let waited = tokio::signal::ctrl_c().await;
    let stopped = instance.stop().await;
    waited?;
    stopped?;
    Ok(())
}
