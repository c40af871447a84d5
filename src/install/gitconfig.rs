// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Global Git configuration wiring.
//!
//! The repository may ship a shared Git configuration file. Instead of linking
//! over the user's own global configuration, dotstrap adds an `include.path`
//! entry pointing at the shared file, so machine-local settings like identity
//! stay in the user's file. Identity is asked for when missing, but only in
//! interactive mode.

use crate::{
    config::GitLayout,
    env::Environment,
    install::journal::{Journal, Mutation},
    prompt::Prompter,
};

use git2::Config;
use std::{fs::OpenOptions, io, path::PathBuf};
use tracing::{debug, info, instrument};

/// Outcome of Git configuration step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GitReport {
    /// Whether include entry was added during this run.
    pub include_added: bool,

    /// Identity keys set during this run.
    pub identity_set: Vec<String>,
}

/// Wire shared configuration into global Git configuration.
///
/// # Errors
///
/// - Return [`GitConfigError::Create`] if global configuration file cannot be
///   created.
/// - Return [`GitConfigError::Git2`] if libgit2 cannot read or write config.
/// - Return [`GitConfigError::Prompt`] if identity questions fail.
#[instrument(skip_all, level = "debug")]
pub fn configure(
    layout: &GitLayout,
    env: &Environment,
    prompter: &mut impl Prompter,
    journal: &mut Journal,
) -> Result<GitReport> {
    let mut report = GitReport::default();
    let include = match layout.include.as_ref().filter(|include| include.exists()) {
        Some(include) => include,
        None => {
            debug!("no shared git configuration to include");
            return Ok(report);
        }
    };

    if layout.config.symlink_metadata().is_err() {
        if let Some(parent) = layout.config.parent() {
            mkdirp::mkdirp(parent).map_err(|source| GitConfigError::Create {
                source,
                path: layout.config.clone(),
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&layout.config)
            .map_err(|source| GitConfigError::Create {
                source,
                path: layout.config.clone(),
            })?;
        journal.record(Mutation::Created {
            path: layout.config.clone(),
        });
    }

    let mut config = Config::open(&layout.config)?;
    let include = include.to_string_lossy().into_owned();
    if has_value(&config, "include.path", &include)? {
        debug!("{include:?} already included from {:?}", layout.config.display());
    } else {
        // INVARIANT: Regex only matches our own entry, so others are kept.
        config.set_multivar(
            "include.path",
            &format!("^{}$", posix_escape(&include)),
            &include,
        )?;
        info!("include {include:?} from {:?}", layout.config.display());
        report.include_added = true;
    }

    for key in ["user.name", "user.email"] {
        if config.get_string(key).is_ok() {
            continue;
        }

        if !env.interactive {
            info!("git {key} is unset, skip asking in non-interactive mode");
            continue;
        }

        if let Some(value) = prompter.text(&format!("git {key}"))? {
            config.set_str(key, &value)?;
            info!("set git {key}");
            report.identity_set.push(key.to_string());
        }
    }

    Ok(report)
}

/// Escape POSIX extended regex metacharacters, as libgit2 uses `regcomp`.
fn posix_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ".[]()*+?{}|^$\\".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn has_value(config: &Config, key: &str, value: &str) -> Result<bool> {
    let mut entries = match config.multivar(key, None) {
        Ok(entries) => entries,
        Err(err) if err.code() == git2::ErrorCode::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };

    while let Some(entry) = entries.next() {
        if entry?.value() == Some(value) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Git configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum GitConfigError {
    /// Global configuration file cannot be created.
    #[error("failed to create git configuration {:?}", path.display())]
    Create {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Identity question could not be asked.
    #[error(transparent)]
    Prompt(#[from] crate::prompt::PromptError),
}

/// Friendly result alias :3
pub type Result<T, E = GitConfigError> = std::result::Result<T, E>;
