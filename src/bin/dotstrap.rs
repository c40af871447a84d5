// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotstrap::{
    config::Manifest,
    env::{Environment, LOG_VAR},
    install::{Installer, RunSummary},
    path::{backup_dir_path, home_dir, install_log_path},
    prompt::{InquirePrompter, Prompter, Unattended},
    Layout, SystemRunner,
};

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::{fs::OpenOptions, path::PathBuf, process::exit, sync::Mutex};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a dotfile repository into your home directory.
///
/// Run from the repository checkout, or point DOTSTRAP_REPO at it. Set
/// DOTSTRAP_INTERACTIVE=0 to never be asked anything.
#[derive(Debug, Clone, Parser)]
#[command(about, long_about, version)]
struct Cli {}

fn main() {
    let _ = Cli::parse();
    let log_path = home_dir().ok().map(install_log_path);
    init_logging(log_path.clone());

    match run() {
        Ok(code) => {
            if let Some(path) = log_path {
                info!("full log kept at {:?}", path.display());
            }
            exit(code)
        }
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn init_logging(log_path: Option<PathBuf>) {
    let console_filter =
        EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let mut open_error = None;
    let file = log_path.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            ),
            Err(err) => {
                open_error = Some(format!("cannot open log {:?}: {err}", path.display()));
                None
            }
        }
    });

    tracing_subscriber::registry().with(console).with(file).init();
    if let Some(message) = open_error {
        warn!("{message}");
    }
}

fn run() -> Result<i32> {
    let env = Environment::detect()?;
    let layout = Manifest::load(&env.repo)?.resolve(&env)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_dir = backup_dir_path(&env.home, &stamp);

    let summary = if env.interactive {
        install(env, layout, backup_dir, InquirePrompter::new())?
    } else {
        install(env, layout, backup_dir, Unattended)?
    };

    Ok(summary.exit_code())
}

fn install(
    env: Environment,
    layout: Layout,
    backup_dir: PathBuf,
    prompter: impl Prompter,
) -> Result<RunSummary> {
    let mut installer = Installer::new(env, layout, backup_dir, SystemRunner::new(), prompter);
    Ok(installer.run()?)
}
