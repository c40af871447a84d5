// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Dotstrap never reimplements the tools it bootstraps. Git, curl, package
//! managers, and version manager installers are all invoked through their
//! command-line interfaces. Every invocation goes through a [`CommandRunner`]
//! so that success or failure is captured as an explicit [`Result`], and so
//! that installation steps can be exercised without spawning real processes.

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
    process::Command,
    time::Duration,
};
use tracing::{debug, instrument};

/// Description of a single external command invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute, looked up through the search path.
    pub program: String,

    /// Arguments passed to program.
    pub args: Vec<String>,

    /// Extra environment variables for program.
    pub envs: Vec<(String, String)>,

    /// Whether program needs the terminal, e.g., to ask for a password.
    pub interactive: bool,
}

impl CommandSpec {
    /// Construct new command specification.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for program.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Hand the terminal over to program.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }
}

impl Display for CommandSpec {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.program)?;
        for arg in &self.args {
            write!(fmt, " {arg}")?;
        }

        Ok(())
    }
}

/// Layer of indirection for running external commands.
pub trait CommandRunner {
    /// Run command to completion.
    ///
    /// Returns combined output of command on success.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError::Spawn`] if command cannot be started.
    /// - Return [`ExecError::Failed`] if command exits unsuccessfully.
    fn run(&self, spec: &CommandSpec) -> Result<String>;

    /// Locate tool on search path.
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Run commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Construct new system command runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip(self, spec), level = "debug")]
    fn run(&self, spec: &CommandSpec) -> Result<String> {
        debug!("run {spec}");
        if spec.interactive {
            syscall_interactive(spec)?;
            return Ok(String::new());
        }

        syscall_non_interactive(spec)
    }

    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }
}

fn syscall_interactive(spec: &CommandSpec) -> Result<()> {
    let status = Command::new(&spec.program)
        .args(&spec.args)
        .envs(spec.envs.iter().map(|(key, value)| (key, value)))
        .spawn()
        .map_err(|source| ExecError::Spawn {
            source,
            command: spec.to_string(),
        })?
        .wait()
        .map_err(|source| ExecError::Spawn {
            source,
            command: spec.to_string(),
        })?;

    if !status.success() {
        return Err(ExecError::Failed {
            command: spec.to_string(),
            message: format!("exited with {status}"),
        });
    }

    Ok(())
}

fn syscall_non_interactive(spec: &CommandSpec) -> Result<String> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    bar.set_message(spec.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let output = Command::new(&spec.program)
        .args(&spec.args)
        .envs(spec.envs.iter().map(|(key, value)| (key, value)))
        .output();
    bar.finish_and_clear();

    let output = output.map_err(|source| ExecError::Spawn {
        source,
        command: spec.to_string(),
    })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(ExecError::Failed {
            command: spec.to_string(),
            message,
        });
    }

    Ok(message)
}

/// External command error types.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Command could not be started or waited on.
    #[error("failed to run {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Command ran but exited unsuccessfully.
    #[error("command {command:?} failed:\n{message}")]
    Failed { command: String, message: String },

    /// Style template cannot be set for progress spinner.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = ExecError> = std::result::Result<T, E>;
