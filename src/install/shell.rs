// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shell framework installation and login shell switch.

use crate::{
    config::ShellLayout,
    env::Environment,
    exec::{CommandRunner, CommandSpec},
    preflight::Capabilities,
    prompt::Prompter,
};

use std::path::Path;
use tracing::{info, instrument, warn};

/// Outcome of shell framework installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkStatus {
    Present,
    Installed,
    Failed,

    /// Login shell binary is unavailable, so framework is pointless.
    Unsupported,
}

/// Outcome of login shell switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellSwitch {
    AlreadyActive,
    Switched,
    Declined,
    Failed,

    /// Not attempted in non-interactive mode.
    Skipped,

    /// Login shell binary is unavailable.
    Unavailable,
}

/// Fetch and run shell framework installer if framework is missing.
///
/// The installer runs unattended in every mode, and is told to keep the
/// existing shell startup file and to leave the login shell alone.
#[instrument(skip_all, level = "debug")]
pub fn ensure_framework(
    layout: &ShellLayout,
    capabilities: &Capabilities,
    runner: &impl CommandRunner,
) -> FrameworkStatus {
    if layout.framework_dir.is_dir() {
        info!(
            "shell framework present at {:?}",
            layout.framework_dir.display()
        );
        return FrameworkStatus::Present;
    }

    if !capabilities.resolve(&layout.login_shell) {
        warn!(
            "{} not found, skip shell framework installation",
            layout.login_shell
        );
        return FrameworkStatus::Unsupported;
    }

    if let Some(tool) = ["sh", "curl"]
        .into_iter()
        .find(|tool| !capabilities.resolve(tool))
    {
        warn!("{tool} not found, skip shell framework installation");
        return FrameworkStatus::Unsupported;
    }

    let command = CommandSpec::new("sh")
        .args([
            "-c".to_string(),
            format!(
                "curl -fsSL {} | sh -s -- --unattended",
                single_quote(&layout.framework_installer)
            ),
        ])
        .env("RUNZSH", "no")
        .env("CHSH", "no")
        .env("KEEP_ZSHRC", "yes")
        .env("ZSH", layout.framework_dir.to_string_lossy());

    match runner.run(&command) {
        Ok(_) => {
            info!(
                "installed shell framework into {:?}",
                layout.framework_dir.display()
            );
            FrameworkStatus::Installed
        }
        Err(err) => {
            warn!("shell framework installation failed: {err}");
            FrameworkStatus::Failed
        }
    }
}

/// Quote value as a single POSIX shell word.
fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Offer switching login shell to configured shell.
///
/// # Errors
///
/// - Return [`PromptError`](crate::prompt::PromptError) if question fails.
#[instrument(skip_all, level = "debug")]
pub fn switch_login_shell(
    layout: &ShellLayout,
    env: &Environment,
    capabilities: &Capabilities,
    runner: &impl CommandRunner,
    prompter: &mut impl Prompter,
) -> crate::prompt::Result<ShellSwitch> {
    let current = env
        .login_shell
        .as_deref()
        .and_then(|shell| Path::new(shell).file_name())
        .map(|name| name.to_string_lossy().into_owned());
    if current.as_deref() == Some(layout.login_shell.as_str()) {
        info!("login shell already {}", layout.login_shell);
        return Ok(ShellSwitch::AlreadyActive);
    }

    let Some(path) = capabilities.path(&layout.login_shell) else {
        warn!("{} not found, keep current login shell", layout.login_shell);
        return Ok(ShellSwitch::Unavailable);
    };

    if !env.interactive {
        info!(
            "skip switching login shell to {} in non-interactive mode",
            layout.login_shell
        );
        return Ok(ShellSwitch::Skipped);
    }

    let question = format!("Switch login shell to {}?", path.display());
    if !prompter.confirm(&question, false)? {
        return Ok(ShellSwitch::Declined);
    }

    let command = CommandSpec::new("chsh")
        .args(["-s".to_string(), path.to_string_lossy().into_owned()])
        .interactive();
    match runner.run(&command) {
        Ok(_) => {
            info!("login shell switched to {}", path.display());
            Ok(ShellSwitch::Switched)
        }
        Err(err) => {
            warn!("failed to switch login shell: {err}");
            Ok(ShellSwitch::Failed)
        }
    }
}
