// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tessera: run procedural-generation programs in the terminal.
//!
//! Loads a program document, seeds a grid, and runs the rewrite engine on
//! an execution thread while the terminal renders snapshots and maps keys
//! to pause / step / reset / rate commands. Exits with code 0 on a normal
//! shutdown; parse errors abort with a message naming the offending
//! attribute, element, and document offset.

#![deny(rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

mod app;
mod render;
mod settings;

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::settings::Settings;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Program document to run (e.g. models/Growth.xml)
    model: Option<PathBuf>,

    /// Use the window backend instead of the console
    #[clap(long)]
    gui: bool,

    /// Root seed for the per-leaf generators (random when omitted)
    #[clap(long)]
    seed: Option<u64>,

    /// Tick-rate bound in ticks per second (0 = unlimited)
    #[clap(long)]
    tickrate: Option<u32>,

    /// Grid extents as DxHxW (e.g. 1x59x59)
    #[clap(long, value_parser = parse_extent)]
    size: Option<[u32; 3]>,

    /// Settings file merged under the flags above
    #[clap(long, default_value = "tessera.json")]
    settings: PathBuf,
}

fn parse_extent(raw: &str) -> Result<[u32; 3], String> {
    let parts: Vec<&str> = raw.split('x').collect();
    let &[d, h, w] = parts.as_slice() else {
        return Err(format!("expected DxHxW, got '{raw}'"));
    };
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| format!("bad extent component '{s}'"))
            .and_then(|v| {
                if v == 0 {
                    Err("extent components must be positive".to_owned())
                } else {
                    Ok(v)
                }
            })
    };
    Ok([parse(d)?, parse(h)?, parse(w)?])
}


fn init_logging() -> Result<()> {
    let file = std::fs::File::create("tessera.log").context("creating tessera.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let mut settings = Settings::load(&args.settings)?;
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(tickrate) = args.tickrate {
        settings.tickrate = tickrate;
    }
    if let Some(extent) = args.size {
        settings.extent = extent;
    }

    if args.gui {
        warn!("window backend not compiled into this build; using the console");
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, model = %settings.model.display(), "starting");

    App { settings, seed }.run()
}
