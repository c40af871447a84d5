// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Installation run.
//!
//! An installation run is a strictly sequential state machine:
//!
//! ```text
//! START → PRECHECK → BACKUP → SYMLINK → SECRETS → GIT_CONFIG
//!       → OPTIONAL_TOOLS → SHELL_SWITCH → VALIDATE → {SUCCESS | FAILED}
//! ```
//!
//! Failure in pre-flight aborts before anything is touched. Failure anywhere
//! from BACKUP through SHELL_SWITCH rolls back every change recorded in the
//! run's [`Journal`], then ends the run as FAILED. A failed validation never
//! rolls back, so the user can inspect what went wrong.

pub mod backup;
pub mod gitconfig;
pub mod journal;
pub mod link;
pub mod secrets;
pub mod shell;
pub mod tools;
pub mod validate;

use crate::{
    config::Layout,
    env::Environment,
    exec::{CommandRunner, SystemRunner},
    install::{
        backup::BackupManager,
        gitconfig::{GitConfigError, GitReport},
        journal::Journal,
        link::{LinkError, SyncReport},
        secrets::{SecretsError, SecretsReport},
        shell::{FrameworkStatus, ShellSwitch},
        tools::ToolsReport,
    },
    preflight::{Capabilities, PreflightError},
    prompt::{InquirePrompter, PromptError, Prompter},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};
use tracing::{error, info, instrument, warn};

/// Stage of installation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Start,
    Precheck,
    Backup,
    Symlink,
    Secrets,
    GitConfig,
    OptionalTools,
    ShellSwitch,
    Validate,
    Success,
    Failed,
}

impl Display for Stage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Start => "START",
            Self::Precheck => "PRECHECK",
            Self::Backup => "BACKUP",
            Self::Symlink => "SYMLINK",
            Self::Secrets => "SECRETS",
            Self::GitConfig => "GIT_CONFIG",
            Self::OptionalTools => "OPTIONAL_TOOLS",
            Self::ShellSwitch => "SHELL_SWITCH",
            Self::Validate => "VALIDATE",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        };

        fmt.write_str(name)
    }
}

/// Final outcome of installation run that got past pre-flight.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step finished and validation passed.
    Success,

    /// Every step finished, but validation found problems.
    ValidationFailed { errors: Vec<String> },

    /// A step failed, and changes made so far were rolled back.
    RolledBack { stage: Stage, error: InstallError },
}

impl RunOutcome {
    /// Process exit code for outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ValidationFailed { .. } => 2,
            Self::RolledBack { .. } => 3,
        }
    }

    /// Check if run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Everything an installation run did.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub backups: usize,

    /// Backup directory, if any backup was made.
    pub backup_dir: Option<PathBuf>,
    pub links: SyncReport,
    pub secrets: Option<SecretsReport>,
    pub git: GitReport,
    pub tools: ToolsReport,
    pub framework: Option<FrameworkStatus>,
    pub shell: Option<ShellSwitch>,

    /// Number of journal entries that could not be undone.
    pub rollback_failures: usize,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            outcome: RunOutcome::Success,
            backups: 0,
            backup_dir: None,
            links: SyncReport::default(),
            secrets: None,
            git: GitReport::default(),
            tools: ToolsReport::default(),
            framework: None,
            shell: None,
            rollback_failures: 0,
        }
    }

    /// Process exit code for run.
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Drive a single installation run.
pub struct Installer<R = SystemRunner, P = InquirePrompter> {
    env: Environment,
    layout: Layout,
    runner: R,
    prompter: P,
    backups: BackupManager,
    journal: Journal,
    stage: Stage,
}

impl<R, P> Installer<R, P>
where
    R: CommandRunner,
    P: Prompter,
{
    /// Construct new installer.
    ///
    /// Backup directory is only created if a backup turns out to be needed.
    pub fn new(
        env: Environment,
        layout: Layout,
        backup_dir: impl Into<PathBuf>,
        runner: R,
        prompter: P,
    ) -> Self {
        Self {
            env,
            layout,
            runner,
            prompter,
            backups: BackupManager::new(backup_dir),
            journal: Journal::new(),
            stage: Stage::Start,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runner used for external commands.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Prompter used for questions.
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Perform installation run.
    ///
    /// Mid-run failures are not returned as errors. They are rolled back and
    /// reported through [`RunOutcome::RolledBack`] instead.
    ///
    /// # Errors
    ///
    /// - Return [`PreflightError`] if pre-flight checks refuse the run. Nothing
    ///   has been changed in that case.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&mut self) -> Result<RunSummary, PreflightError> {
        info!(
            "install from {:?} into {:?} ({}, {})",
            self.env.repo.display(),
            self.env.home.display(),
            self.env.platform,
            if self.env.interactive {
                "interactive"
            } else {
                "non-interactive"
            }
        );

        self.enter(Stage::Precheck);
        let mut capabilities =
            match crate::preflight::run(&self.env, &self.layout, &self.runner, &mut self.prompter) {
                Ok(capabilities) => capabilities,
                Err(err) => {
                    self.enter(Stage::Failed);
                    return Err(err);
                }
            };

        let mut summary = RunSummary::new();
        if let Err(err) = self.mutate(&mut capabilities, &mut summary) {
            let stage = self.stage;
            error!("{stage} failed: {err}");
            summary.backup_dir = self.used_backup_dir();
            summary.rollback_failures = self.rollback();
            summary.outcome = RunOutcome::RolledBack { stage, error: err };
            self.enter(Stage::Failed);
            log_summary(&summary);
            return Ok(summary);
        }
        summary.backup_dir = self.used_backup_dir();

        self.enter(Stage::Validate);
        let validation = validate::validate(&self.layout);
        if validation.is_success() {
            self.enter(Stage::Success);
        } else {
            error!("validation failed with {} error(s)", validation.error_count());
            summary.outcome = RunOutcome::ValidationFailed {
                errors: validation.errors,
            };
            self.enter(Stage::Failed);
        }

        log_summary(&summary);
        Ok(summary)
    }

    fn mutate(&mut self, capabilities: &mut Capabilities, summary: &mut RunSummary) -> Result<()> {
        self.enter(Stage::Backup);
        summary.backups =
            link::backup_targets(&self.layout.links, &mut self.backups, &mut self.journal)?;

        self.enter(Stage::Symlink);
        summary.links = link::sync_links(&self.layout.links, &mut self.journal)?;

        self.enter(Stage::Secrets);
        summary.secrets = Some(secrets::provision(&self.layout.secrets, &mut self.journal)?);

        self.enter(Stage::GitConfig);
        summary.git = gitconfig::configure(
            &self.layout.git,
            &self.env,
            &mut self.prompter,
            &mut self.journal,
        )?;

        self.enter(Stage::OptionalTools);
        summary.tools = tools::install_optional(
            &self.layout.tools,
            &self.env,
            capabilities,
            &self.runner,
            &mut self.prompter,
        )?;

        self.enter(Stage::ShellSwitch);
        summary.framework = Some(shell::ensure_framework(
            &self.layout.shell,
            capabilities,
            &self.runner,
        ));
        summary.shell = Some(shell::switch_login_shell(
            &self.layout.shell,
            &self.env,
            capabilities,
            &self.runner,
            &mut self.prompter,
        )?);

        Ok(())
    }

    fn rollback(&mut self) -> usize {
        info!("rolling back {} change(s)", self.journal.entries().len());
        let failures = self.journal.rollback();
        if failures > 0 {
            warn!("{failures} change(s) could not be rolled back");
        }

        failures
    }

    fn used_backup_dir(&self) -> Option<PathBuf> {
        self.backups
            .is_used()
            .then(|| self.backups.dir().to_path_buf())
    }

    fn enter(&mut self, stage: Stage) {
        info!("{} → {}", self.stage, stage);
        self.stage = stage;
    }
}

fn log_summary(summary: &RunSummary) {
    info!(
        "links: {} created, {} replaced, {} unchanged, {} skipped",
        summary.links.created.len(),
        summary.links.replaced.len(),
        summary.links.unchanged.len(),
        summary.links.skipped.len()
    );

    if let Some(dir) = &summary.backup_dir {
        info!("{} backup(s) kept in {:?}", summary.backups, dir.display());
    }

    match &summary.outcome {
        RunOutcome::Success => info!("installation complete"),
        RunOutcome::ValidationFailed { errors } => {
            error!("installation finished with {} validation error(s)", errors.len())
        }
        RunOutcome::RolledBack { stage, .. } => {
            error!("installation failed during {stage}, changes rolled back")
        }
    }
}

/// Mid-run error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Backup or symlink synchronization failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Secrets file provisioning failed.
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// Git configuration failed.
    #[error(transparent)]
    GitConfig(#[from] GitConfigError),

    /// Question could not be asked.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
