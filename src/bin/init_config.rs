//! init-config: write a commented default configuration file for WalletWatch
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use walletwatch::config::{generate_commented_config_template, generate_config_template};

#[derive(Parser, Debug)]
#[command(
    name    = "init-config",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Write a default `config.toml` for WalletWatch"
)]
struct Args {
    /// Output path (default: ./config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overwrite if the file already exists
    #[arg(short, long)]
    force: bool,

    /// Write bare values without explanatory comments
    #[arg(long)]
    plain: bool,
}

fn main() -> Result<()> {
    walletwatch::utils::init_logging("info");
    let args = Args::parse();

    if args.config.exists() && !args.force {
        eprintln!("Config file {} exists. Use --force to overwrite.", args.config.display());
        std::process::exit(1);
    }

    if args.plain {
        generate_config_template(&args.config)?;
    } else {
        generate_commented_config_template(&args.config)?;
    }
    log::info!("Wrote default configuration to {}", args.config.display());
    println!("Wrote default configuration to {}", args.config.display());
    Ok(())
}
