// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Post-condition validation.
//!
//! Confirms a run achieved its goal before declaring success. Validation never
//! changes anything, so a failed validation leaves the file system exactly as
//! the run left it for inspection.

use crate::{
    config::Layout,
    install::{
        link::{inspect, TargetState},
        secrets::{file_mode, SECRETS_MODE},
    },
};

use tracing::{error, info, instrument};

/// Result of validation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Description of each failed check.
    pub errors: Vec<String>,
}

impl Validation {
    /// Check if every check passed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed checks.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    fn fail(&mut self, message: String) {
        error!("{message}");
        self.errors.push(message);
    }
}

/// Check end state of installation.
///
/// - Every managed target whose source exists links to its source.
/// - Secrets file, if present, has owner-only permissions.
/// - Shell framework directory exists.
#[instrument(skip_all, level = "debug")]
pub fn validate(layout: &Layout) -> Validation {
    let mut validation = Validation::default();

    for link in layout.links.iter().filter(|link| link.source.exists()) {
        if inspect(link) != TargetState::Linked {
            validation.fail(format!(
                "{:?} is not a symlink to {:?}",
                link.target.display(),
                link.source.display()
            ));
        }
    }

    if layout.secrets.path.exists() {
        match file_mode(&layout.secrets.path) {
            Ok(mode) if mode == SECRETS_MODE => {}
            Ok(mode) => validation.fail(format!(
                "{:?} has mode {mode:o}, expected {SECRETS_MODE:o}",
                layout.secrets.path.display()
            )),
            Err(err) => validation.fail(err.to_string()),
        }
    }

    if !layout.shell.framework_dir.is_dir() {
        validation.fail(format!(
            "shell framework directory {:?} is missing",
            layout.shell.framework_dir.display()
        ));
    }

    if validation.is_success() {
        info!("validation passed");
    }

    validation
}
