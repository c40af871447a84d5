// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pre-flight validation.
//!
//! Refuse unsafe or doomed installations before anything on the file system
//! is touched. Pre-flight performs three checks in order:
//!
//! 1. __Privilege__: running as the superuser is refused outright.
//! 2. __Required tooling__: Git and curl must be on the search path.
//! 3. __Secret-pattern scan__: the home directory is scanned for text that
//!    looks like credentials. Findings are advisory. Interactive runs ask
//!    whether to continue, unattended runs log a warning and carry on.
//!
//! Tool lookups happen once here, and are cached into [`Capabilities`] for the
//! rest of the run.

pub mod scan;

use crate::{
    config::Layout,
    env::Environment,
    exec::CommandRunner,
    path::{BACKUP_DIR_PREFIX, INSTALL_LOG_FILE},
    preflight::scan::SecretScanner,
    prompt::Prompter,
};

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Tools whose absence makes installation pointless.
pub const REQUIRED_TOOLS: [&str; 2] = ["git", "curl"];

/// Tools consulted by later installation steps.
pub const SUPPORT_TOOLS: [&str; 5] = ["sh", "bash", "brew", "chsh", "zsh"];

/// Cached tool availability.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Capabilities {
    tools: BTreeMap<String, PathBuf>,
}

impl Capabilities {
    /// Look up availability of each tool through runner.
    pub fn detect(
        runner: &impl CommandRunner,
        tools: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let mut found = BTreeMap::new();
        for tool in tools {
            let tool = tool.as_ref();
            if found.contains_key(tool) {
                continue;
            }

            match runner.locate(tool) {
                Some(path) => {
                    debug!("found {tool} at {:?}", path.display());
                    found.insert(tool.to_string(), path);
                }
                None => debug!("{tool} not found on search path"),
            }
        }

        Self { tools: found }
    }

    /// Check if tool was found on search path during detection.
    pub fn resolve(&self, tool: &str) -> bool {
        self.tools.contains_key(tool)
    }

    /// Path of tool, if found.
    pub fn path(&self, tool: &str) -> Option<&Path> {
        self.tools.get(tool).map(PathBuf::as_path)
    }

    /// Record tool as available.
    pub fn insert(&mut self, tool: impl Into<String>, path: impl Into<PathBuf>) {
        self.tools.insert(tool.into(), path.into());
    }
}

/// Run all pre-flight checks.
///
/// # Errors
///
/// - Return [`PreflightError::Superuser`] if running as superuser.
/// - Return [`PreflightError::RepoMissing`] if repository is not a directory.
/// - Return [`PreflightError::MissingTools`] if a required tool is missing.
/// - Return [`PreflightError::Aborted`] if user declines to continue after
///   secret-pattern findings.
#[instrument(skip_all, level = "debug")]
pub fn run(
    env: &Environment,
    layout: &Layout,
    runner: &impl CommandRunner,
    prompter: &mut impl Prompter,
) -> Result<Capabilities> {
    check_privilege(env)?;
    check_repo(env)?;

    let capabilities = Capabilities::detect(
        runner,
        REQUIRED_TOOLS
            .iter()
            .chain(SUPPORT_TOOLS.iter())
            .map(|tool| tool.to_string())
            .chain(std::iter::once(layout.shell.login_shell.clone()))
            .chain(layout.tools.iter().cloned()),
    );
    check_required(&capabilities)?;
    check_secrets(env, layout, prompter)?;

    info!("pre-flight checks passed");
    Ok(capabilities)
}

/// Refuse to run as superuser.
///
/// # Errors
///
/// - Return [`PreflightError::Superuser`] if running as superuser.
pub fn check_privilege(env: &Environment) -> Result<()> {
    if env.superuser {
        return Err(PreflightError::Superuser);
    }

    Ok(())
}

/// Make sure repository checkout exists.
///
/// # Errors
///
/// - Return [`PreflightError::RepoMissing`] if repository is not a directory.
pub fn check_repo(env: &Environment) -> Result<()> {
    if !env.repo.is_dir() {
        return Err(PreflightError::RepoMissing {
            path: env.repo.clone(),
        });
    }

    Ok(())
}

/// Make sure every required tool was found.
///
/// # Errors
///
/// - Return [`PreflightError::MissingTools`] listing every missing tool.
pub fn check_required(capabilities: &Capabilities) -> Result<()> {
    let missing = REQUIRED_TOOLS
        .iter()
        .filter(|tool| !capabilities.resolve(tool))
        .map(|tool| tool.to_string())
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(PreflightError::MissingTools {
            tools: missing.join(", "),
        });
    }

    Ok(())
}

/// Scan home directory for credential-like text.
///
/// Excludes the secrets file, earlier backup directories, and the install
/// log, since those are expected to hold or mirror sensitive content.
///
/// # Errors
///
/// - Return [`PreflightError::Aborted`] if user declines to continue.
/// - Return [`PreflightError::Prompt`] if the question cannot be asked.
pub fn check_secrets(env: &Environment, layout: &Layout, prompter: &mut impl Prompter) -> Result<()> {
    let mut scanner = SecretScanner::new(layout.scan.clone())?
        .exclude(&layout.secrets.path)
        .exclude(env.home.join(INSTALL_LOG_FILE));
    if let Ok(entries) = std::fs::read_dir(&env.home) {
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(BACKUP_DIR_PREFIX) {
                scanner = scanner.exclude(entry.path());
            }
        }
    }

    let findings = scanner.scan_dir(&env.home);
    if findings.is_empty() {
        debug!("secret scan found nothing");
        return Ok(());
    }

    for finding in &findings {
        warn!("possible secret at {finding}");
    }

    if !env.interactive {
        warn!(
            "{} possible secret(s) found, continuing in non-interactive mode",
            findings.len()
        );
        return Ok(());
    }

    let proceed = prompter.confirm(
        &format!(
            "{} possible secret(s) found in home directory, continue anyway?",
            findings.len()
        ),
        false,
    )?;
    if !proceed {
        return Err(PreflightError::Aborted);
    }

    Ok(())
}

/// Pre-flight error types.
#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    /// Running as superuser.
    #[error("refusing to install as superuser, run as your regular user instead")]
    Superuser,

    /// Required tools are not on search path.
    #[error("required tools missing from search path: {tools}")]
    MissingTools { tools: String },

    /// Repository checkout does not exist.
    #[error("repository checkout {:?} is not a directory", path.display())]
    RepoMissing { path: PathBuf },

    /// User declined to continue after secret scan.
    #[error("installation aborted by user after secret scan")]
    Aborted,

    /// Secret scanner could not be built.
    #[error(transparent)]
    Scan(#[from] crate::preflight::scan::ScanError),

    /// Question could not be asked.
    #[error(transparent)]
    Prompt(#[from] crate::prompt::PromptError),
}

/// Friendly result alias :3
pub type Result<T, E = PreflightError> = std::result::Result<T, E>;
