use clap::Parser;
use std::{fs, path::Path, process};

mod cli;
mod config;
mod crypto;
mod document;
mod engine;
mod error;
mod header;
mod logging;
mod pipeline;
mod util;

use cli::{Cli, Command};
use config::{Layout, load_layout};
use crypto::encrypted_pairs;
use error::Result;
use pipeline::{check_pipeline, discover_actions};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    logging::init(if args.verbose { "debug" } else { "info" });

    match run_compendium(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run_compendium(args: Cli) -> Result<()> {
    let layout = load_layout(&args.file)?;

    match args.command {
        Command::Encrypt { passphrase, files } => {
            crypto::encrypt(&layout, &passphrase, &files).await
        }
        Command::Decrypt { passphrase } => crypto::decrypt(&layout, passphrase.as_deref()).await,
        Command::Document {
            what,
            filename,
            overwrite,
        } => {
            let actions = discover_actions(&layout)?;
            let pairs = encrypted_pairs(&layout)?;
            document::generate(
                &layout,
                &actions,
                &pairs,
                &what,
                filename.as_deref(),
                overwrite,
            )
            .await
        }
        Command::Check => run_check(&layout),
        Command::Export { passphrase, output } => {
            run_export(&layout, passphrase.as_deref(), output.as_deref())
        }
    }
}

fn run_check(layout: &Layout) -> Result<()> {
    let actions = discover_actions(layout)?;
    let pairs = encrypted_pairs(layout)?;

    let errors = check_pipeline(layout, &actions, &pairs);
    if errors.is_empty() {
        return Ok(());
    }

    eprintln!("Package checking resulted in one or more errors:");
    for error in &errors {
        eprintln!("- {}", error);
    }
    process::exit(1);
}

fn run_export(layout: &Layout, passphrase: Option<&str>, output: Option<&Path>) -> Result<()> {
    let actions = discover_actions(layout)?;
    let pairs = encrypted_pairs(layout)?;

    let specs = engine::task_specs(layout, &actions, &pairs, passphrase);
    let json = serde_json::to_string_pretty(&specs)?;

    match output {
        Some(path) => fs::write(layout.resolve(path), json + "\n")?,
        None => println!("{}", json),
    }
    Ok(())
}
