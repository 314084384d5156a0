//! # Pulsetrace CLI
//!
//! Command-line shell around `pulse_core`: collects generator parameters,
//! requests a profile from the external generator, writes the rendered
//! drawing, and manages the local profile store.

mod cli;
mod commands;
mod generator;
mod paths;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use pulse_core::ProfileStore;

use crate::cli::{Cli, Command};
use crate::generator::GeneratorClient;
use crate::paths::PathConfig;

fn main() {
    let args = Cli::parse();
    init_logging(args.verbosity);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace.
/// RUST_LOG still wins when set.
fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .filter_module("reqwest", log::LevelFilter::Warn)
        .format_timestamp_millis()
        .init();
}

fn run(args: Cli) -> Result<()> {
    debug!("Command-line args: {:?}", args);
    let path_config = PathConfig::from_env_and_cli(args.data_dir);
    let store_path = path_config.store_file();
    info!("Profile store: {}", store_path.display());

    match args.command {
        Command::Render { input, render } => {
            let parsed = commands::read_segments(input.as_deref())?;
            let output = commands::render_profile(&parsed, &render)?;
            commands::write_output(render.output.as_deref(), output.as_bytes())
        }
        Command::Generate {
            profile,
            params,
            url,
            render,
        } => {
            let params = match profile {
                Some(reference) => {
                    let mut store = ProfileStore::open(&store_path);
                    let id = commands::resolve_profile(&mut store, &reference)?;
                    let saved = store
                        .find(id)?
                        .with_context(|| format!("Profile {} disappeared from the store", id))?;
                    info!("Using saved profile '{}' ({})", saved.name, id);
                    saved.params()
                }
                None => params.to_params(),
            };

            let client = GeneratorClient::new(paths::generator_url(url))?;
            let parsed = client
                .generate(&params)
                .with_context(|| format!("Profile generation via {} failed", client.url()))?;
            let output = commands::render_profile(&parsed, &render)?;
            commands::write_output(render.output.as_deref(), output.as_bytes())
        }
        Command::Profiles(command) => {
            let mut store = ProfileStore::open(&store_path);
            let mut stdout = io::stdout().lock();
            commands::run_profiles(&mut store, command, &mut stdout)
        }
    }
}
