// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Execution context detection.
//!
//! Dotstrap classifies the context it runs in exactly once at startup. The
//! resulting [`Environment`] is handed to every installation step, so no step
//! ever needs to peek at process environment variables on its own. This keeps
//! a run deterministic for a given set of inputs.
//!
//! # Interactive Mode
//!
//! Interactive mode is assumed unless a non-interactive signal shows up. The
//! following signals are recognized:
//!
//! - `CI` set to anything other than `false` or `0`.
//! - `GITHUB_ACTIONS`, `CODESPACES`, `REMOTE_CONTAINERS`, or `DEVCONTAINER`
//!   set to `true`.
//! - Standard input is not a terminal.
//!
//! The `DOTSTRAP_INTERACTIVE` override can turn interactive mode off, but it
//! can never turn it back on once a non-interactive signal is present.

use crate::path::home_dir;

use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::IsTerminal,
    path::PathBuf,
};
use tracing::debug;

/// Environment variable that overrides interactive mode.
pub const INTERACTIVE_VAR: &str = "DOTSTRAP_INTERACTIVE";

/// Environment variable that points at the dotfile repository checkout.
pub const REPO_VAR: &str = "DOTSTRAP_REPO";

/// Environment variable holding console log filter directives.
pub const LOG_VAR: &str = "DOTSTRAP_LOG";

const TRUTHY_SIGNALS: [&str; 4] = [
    "GITHUB_ACTIONS",
    "CODESPACES",
    "REMOTE_CONTAINERS",
    "DEVCONTAINER",
];

/// Host platform dotstrap is running on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    #[default]
    Linux,
    Wsl,
    Other,
}

impl Platform {
    /// Classify platform from compile target and kernel release string.
    pub fn classify(vars: &HashMap<String, String>, kernel_release: Option<&str>) -> Self {
        if cfg!(target_os = "macos") {
            return Self::MacOs;
        }

        if !cfg!(target_os = "linux") {
            return Self::Other;
        }

        let wsl_marker = kernel_release
            .map(|release| release.to_ascii_lowercase().contains("microsoft"))
            .unwrap_or(false);
        if vars.contains_key("WSL_DISTRO_NAME") || wsl_marker {
            Self::Wsl
        } else {
            Self::Linux
        }
    }
}

impl Display for Platform {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Wsl => "wsl",
            Self::Other => "other",
        };
        fmt.write_str(name)
    }
}

/// Raw inputs gathered from the host before classification.
///
/// Separating raw signals from classification lets callers feed in any
/// combination of signals without touching the real process environment.
#[derive(Debug, Default, Clone)]
pub struct HostSignals {
    /// Snapshot of process environment variables.
    pub vars: HashMap<String, String>,

    /// Whether standard input is attached to a terminal.
    pub stdin_is_terminal: bool,

    /// Effective user id of the current process.
    pub euid: u32,

    /// Kernel release string, e.g., contents of `/proc/sys/kernel/osrelease`.
    pub kernel_release: Option<String>,

    /// Current working directory.
    pub cwd: PathBuf,

    /// Home directory of current user.
    pub home: PathBuf,
}

impl HostSignals {
    /// Read signals of the current process.
    ///
    /// # Errors
    ///
    /// - Return [`EnvError::NoWayHome`] if home directory cannot be determined.
    /// - Return [`EnvError::CurrentDir`] if working directory is unreadable.
    pub fn current() -> Result<Self> {
        Ok(Self {
            vars: std::env::vars().collect(),
            stdin_is_terminal: std::io::stdin().is_terminal(),
            euid: effective_uid(),
            kernel_release: read_to_string("/proc/sys/kernel/osrelease")
                .ok()
                .map(|release| release.trim().to_string()),
            cwd: std::env::current_dir().map_err(EnvError::CurrentDir)?,
            home: home_dir()?,
        })
    }
}

/// Classified execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Home directory that receives managed links.
    pub home: PathBuf,

    /// Dotfile repository checkout holding link sources.
    pub repo: PathBuf,

    /// Whether prompts may be issued.
    pub interactive: bool,

    /// Host platform.
    pub platform: Platform,

    /// Whether the effective user is the superuser.
    pub superuser: bool,

    /// Current login shell, taken from `SHELL`.
    pub login_shell: Option<String>,

    /// Snapshot of environment variables used for path expansion.
    pub vars: HashMap<String, String>,
}

impl Environment {
    /// Detect execution context of current process.
    ///
    /// # Errors
    ///
    /// - Return [`EnvError`] if host signals cannot be read.
    pub fn detect() -> Result<Self> {
        Ok(Self::classify(HostSignals::current()?))
    }

    /// Classify execution context from raw host signals.
    pub fn classify(signals: HostSignals) -> Self {
        let interactive = detect_interactive(&signals.vars, signals.stdin_is_terminal);
        let platform = Platform::classify(&signals.vars, signals.kernel_release.as_deref());
        let repo = signals
            .vars
            .get(REPO_VAR)
            .filter(|repo| !repo.is_empty())
            .map(|repo| crate::path::resolve_against(&signals.cwd, repo))
            .unwrap_or(signals.cwd);
        let login_shell = signals.vars.get("SHELL").cloned();

        let environment = Self {
            home: signals.home,
            repo,
            interactive,
            platform,
            superuser: signals.euid == 0,
            login_shell,
            vars: signals.vars,
        };
        debug!(
            "classified environment: platform={} interactive={}",
            environment.platform, environment.interactive
        );

        environment
    }

    /// Look up environment variable from snapshot.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Decide if prompts may be issued.
///
/// Any recognized non-interactive signal forces `false` regardless of the
/// `DOTSTRAP_INTERACTIVE` override.
pub fn detect_interactive(vars: &HashMap<String, String>, stdin_is_terminal: bool) -> bool {
    if !stdin_is_terminal {
        return false;
    }

    let ci = vars
        .get("CI")
        .map(|value| !matches!(value.to_ascii_lowercase().as_str(), "" | "false" | "0"))
        .unwrap_or(false);
    if ci {
        return false;
    }

    if TRUTHY_SIGNALS.iter().any(|key| is_true(vars.get(*key))) {
        return false;
    }

    match vars.get(INTERACTIVE_VAR).map(|value| value.to_ascii_lowercase()) {
        Some(value) if matches!(value.as_str(), "0" | "false" | "no") => false,
        _ => true,
    }
}

fn is_true(value: Option<&String>) -> bool {
    value
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

#[cfg(unix)]
fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

#[cfg(not(unix))]
fn effective_uid() -> u32 {
    u32::MAX
}

/// Environment detection error types.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// Home directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Current working directory cannot be read.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = EnvError> = std::result::Result<T, E>;
