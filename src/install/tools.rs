// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Optional tool installation.
//!
//! Language runtime version managers are nice to have, but the shell works
//! fine without them. Installation is therefore best effort: each tool is
//! offered individually in interactive mode, skipped outright in
//! non-interactive mode, and a failed install only produces a warning.

use crate::{
    env::{Environment, Platform},
    exec::{CommandRunner, CommandSpec},
    preflight::Capabilities,
    prompt::Prompter,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use tracing::{info, instrument, warn};

/// Known optional tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Fast Node.js version manager.
    Fnm,

    /// Python version manager.
    Pyenv,
}

impl Tool {
    /// Name of tool binary.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fnm => "fnm",
            Self::Pyenv => "pyenv",
        }
    }

    /// Short description shown when offering tool.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Fnm => "Node.js version manager",
            Self::Pyenv => "Python version manager",
        }
    }

    /// Command that installs tool on platform.
    ///
    /// Homebrew is preferred on macOS when available. Otherwise the upstream
    /// install script is fetched through curl.
    pub fn install_command(&self, platform: Platform, capabilities: &Capabilities) -> CommandSpec {
        if platform == Platform::MacOs && capabilities.resolve("brew") {
            return CommandSpec::new("brew").args(["install", self.name()]);
        }

        let script = match self {
            Self::Fnm => "curl -fsSL https://fnm.vercel.app/install | bash -s -- --skip-shell",
            Self::Pyenv => "curl -fsSL https://pyenv.run | bash",
        };
        CommandSpec::new("bash").args(["-c", script])
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "fnm" => Ok(Self::Fnm),
            "pyenv" => Ok(Self::Pyenv),
            other => Err(other.to_string()),
        }
    }
}

impl Display for Tool {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.name())
    }
}

/// Outcome of optional tool installation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToolsReport {
    pub installed: Vec<Tool>,
    pub present: Vec<Tool>,
    pub declined: Vec<Tool>,
    pub failed: Vec<Tool>,

    /// Whether the whole step was skipped for lack of interactivity.
    pub skipped: bool,
}

/// Offer and install optional tools.
///
/// # Errors
///
/// - Return [`PromptError`](crate::prompt::PromptError) if a question fails.
#[instrument(skip_all, level = "debug")]
pub fn install_optional(
    names: &[String],
    env: &Environment,
    capabilities: &mut Capabilities,
    runner: &impl CommandRunner,
    prompter: &mut impl Prompter,
) -> crate::prompt::Result<ToolsReport> {
    let mut report = ToolsReport::default();
    if names.is_empty() {
        return Ok(report);
    }

    if !env.interactive {
        info!("skip optional tools in non-interactive mode");
        report.skipped = true;
        return Ok(report);
    }

    for name in names {
        let tool = match name.parse::<Tool>() {
            Ok(tool) => tool,
            Err(unknown) => {
                warn!("unknown optional tool {unknown:?}, ignoring it");
                continue;
            }
        };

        if capabilities.resolve(tool.name()) {
            info!("{tool} already installed");
            report.present.push(tool);
            continue;
        }

        let question = format!("Install {tool} ({})?", tool.summary());
        if !prompter.confirm(&question, false)? {
            info!("skip {tool}");
            report.declined.push(tool);
            continue;
        }

        let command = tool.install_command(env.platform, capabilities);
        match runner.run(&command) {
            Ok(_) => {
                info!("installed {tool}");
                if let Some(path) = runner.locate(tool.name()) {
                    capabilities.insert(tool.name(), path);
                }
                report.installed.push(tool);
            }
            Err(err) => {
                warn!("failed to install {tool}: {err}");
                report.failed.push(tool);
            }
        }
    }

    Ok(report)
}
