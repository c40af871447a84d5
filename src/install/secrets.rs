// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Secrets file provisioning.
//!
//! The secrets file holds tokens and passwords that must never be readable by
//! anyone but its owner. It is seeded from a repository template on first run,
//! and its permission bits are checked and forced to owner read-write on
//! _every_ run, not just the first one.

use crate::{
    config::SecretsLayout,
    install::journal::{Journal, Mutation},
};

use std::{
    fs::{copy, set_permissions, Permissions},
    io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Owner read-write, nothing for group or others.
pub const SECRETS_MODE: u32 = 0o600;

/// Outcome of secrets provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsStatus {
    /// File was seeded from template.
    Created,

    /// File already existed.
    Existing,

    /// File is absent and no template was available.
    Missing,
}

/// Report of secrets provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretsReport {
    pub status: SecretsStatus,

    /// Whether permission bits had to be corrected.
    pub corrected: bool,
}

/// Make sure secrets file exists with owner-only permissions.
///
/// # Errors
///
/// - Return [`SecretsError::Seed`] if template cannot be copied.
/// - Return [`SecretsError::Permissions`] if permission bits cannot be read or
///   corrected.
#[instrument(skip_all, level = "debug")]
pub fn provision(layout: &SecretsLayout, journal: &mut Journal) -> Result<SecretsReport> {
    let status = if layout.path.symlink_metadata().is_ok() {
        SecretsStatus::Existing
    } else {
        match layout.template.as_deref().filter(|template| template.exists()) {
            Some(template) => {
                // INVARIANT: Journal before copying, so a partial file is undone.
                journal.record(Mutation::Created {
                    path: layout.path.clone(),
                });
                seed(template, &layout.path)?;
                info!(
                    "created {:?} from template {:?}",
                    layout.path.display(),
                    template.display()
                );
                SecretsStatus::Created
            }
            None => {
                warn!(
                    "no secrets template available, skip creating {:?}",
                    layout.path.display()
                );
                return Ok(SecretsReport {
                    status: SecretsStatus::Missing,
                    corrected: false,
                });
            }
        }
    };

    let corrected = enforce_permissions(&layout.path)?;
    Ok(SecretsReport { status, corrected })
}

/// Force owner-only permission bits on file.
///
/// Returns `true` if bits had to be changed.
///
/// # Errors
///
/// - Return [`SecretsError::Permissions`] if bits cannot be read or set.
pub fn enforce_permissions(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let mode = file_mode(path)?;
    if mode == SECRETS_MODE {
        return Ok(false);
    }

    set_permissions(path, Permissions::from_mode(SECRETS_MODE)).map_err(|source| {
        SecretsError::Permissions {
            source,
            path: path.to_path_buf(),
        }
    })?;
    warn!(
        "corrected permissions of {:?} from {mode:o} to {SECRETS_MODE:o}",
        path.display()
    );

    Ok(true)
}

/// Read permission bits of file, masked to `0o777`.
///
/// # Errors
///
/// - Return [`SecretsError::Permissions`] if metadata cannot be read.
pub fn file_mode(path: impl AsRef<Path>) -> Result<u32> {
    let path = path.as_ref();
    path.metadata()
        .map(|meta| meta.permissions().mode() & 0o777)
        .map_err(|source| SecretsError::Permissions {
            source,
            path: path.to_path_buf(),
        })
}

fn seed(template: &Path, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        mkdirp::mkdirp(parent).map_err(|source| SecretsError::Seed {
            source,
            template: template.to_path_buf(),
            path: path.to_path_buf(),
        })?;
    }

    copy(template, path).map_err(|source| SecretsError::Seed {
        source,
        template: template.to_path_buf(),
        path: path.to_path_buf(),
    })?;

    Ok(())
}

/// Secrets provisioning error types.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    /// Template cannot be copied into place.
    #[error("failed to create {:?} from template {:?}", path.display(), template.display())]
    Seed {
        #[source]
        source: io::Error,
        template: PathBuf,
        path: PathBuf,
    },

    /// Permission bits cannot be read or changed.
    #[error("failed to secure permissions of {:?}", path.display())]
    Permissions {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SecretsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::fs::{read_to_string, write};
    use tempfile::TempDir;

    fn layout(root: &Path) -> SecretsLayout {
        SecretsLayout {
            path: root.join("home/.secrets"),
            template: Some(root.join("repo/secrets.example")),
        }
    }

    #[test_case(Some(0o644); "world readable")]
    #[test_case(Some(0o777); "world writable")]
    #[test_case(Some(0o600); "already private")]
    #[test_case(None; "absent")]
    #[test]
    fn permissions_converge_to_owner_only(initial: Option<u32>) -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let layout = layout(root.path());
        mkdirp::mkdirp(root.path().join("repo"))?;
        write(root.path().join("repo/secrets.example"), "export TOKEN=\n")?;
        if let Some(mode) = initial {
            mkdirp::mkdirp(root.path().join("home"))?;
            write(&layout.path, "export TOKEN=abc\n")?;
            set_permissions(&layout.path, Permissions::from_mode(mode))?;
        }

        let mut journal = Journal::new();
        let report = provision(&layout, &mut journal)?;
        self::assert_eq!(file_mode(&layout.path)?, SECRETS_MODE);

        match initial {
            Some(mode) => {
                self::assert_eq!(report.status, SecretsStatus::Existing);
                self::assert_eq!(report.corrected, mode != SECRETS_MODE);
                self::assert_eq!(read_to_string(&layout.path)?, "export TOKEN=abc\n");
                assert!(journal.is_empty());
            }
            None => {
                self::assert_eq!(report.status, SecretsStatus::Created);
                self::assert_eq!(read_to_string(&layout.path)?, "export TOKEN=\n");
                self::assert_eq!(journal.entries().len(), 1);
            }
        }

        Ok(())
    }

    #[test]
    fn failed_seed_is_still_undone() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let layout = layout(root.path());
        mkdirp::mkdirp(root.path().join("repo/secrets.example"))?;

        let mut journal = Journal::new();
        let result = provision(&layout, &mut journal);
        assert!(matches!(result, Err(SecretsError::Seed { .. })));
        assert_eq!(
            journal.entries(),
            &[Mutation::Created {
                path: layout.path.clone()
            }]
        );

        write(&layout.path, "partial")?;
        assert_eq!(journal.rollback(), 0);
        assert!(layout.path.symlink_metadata().is_err());

        Ok(())
    }

    #[test]
    fn missing_template_is_not_fatal() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let layout = layout(root.path());

        let report = provision(&layout, &mut Journal::new())?;
        assert_eq!(report.status, SecretsStatus::Missing);
        assert!(!layout.path.exists());

        Ok(())
    }
}
