// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symlink synchronization.
//!
//! Makes every managed target a symlink to its source in the repository
//! checkout. Targets that already point at their source are left alone, so
//! synchronizing twice in a row changes nothing the second time. Directories
//! are linked as a whole, never merged.
//!
//! A managed pair whose source is missing from the checkout is skipped, since
//! linking it would leave a dangling symlink behind.

use crate::{
    config::ManagedLink,
    install::{
        backup::{remove_entry, BackupManager, BackupError},
        journal::{Journal, Mutation},
    },
};

use std::{
    fs::{canonicalize, read_link},
    io,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Current state of a managed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Nothing exists at target.
    Absent,

    /// Target is a symlink to its source.
    Linked,

    /// Something else exists at target.
    Occupied,
}

/// Inspect current state of managed target.
pub fn inspect(link: &ManagedLink) -> TargetState {
    let Ok(meta) = link.target.symlink_metadata() else {
        return TargetState::Absent;
    };

    if meta.file_type().is_symlink() && points_at(&link.target, &link.source) {
        TargetState::Linked
    } else {
        TargetState::Occupied
    }
}

fn points_at(target: &Path, source: &Path) -> bool {
    match read_link(target) {
        Ok(dest) if dest == source => true,
        Ok(_) => match (canonicalize(target), canonicalize(source)) {
            (Ok(lhs), Ok(rhs)) => lhs == rhs,
            _ => false,
        },
        Err(_) => false,
    }
}

/// Outcome of synchronizing managed links.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Targets that did not exist and were linked.
    pub created: Vec<PathBuf>,

    /// Targets whose previous content was replaced with a link.
    pub replaced: Vec<PathBuf>,

    /// Targets that already linked to their source.
    pub unchanged: Vec<PathBuf>,

    /// Targets skipped because their source is missing.
    pub skipped: Vec<PathBuf>,
}

impl SyncReport {
    /// Check if synchronization changed anything.
    pub fn has_changes(&self) -> bool {
        !self.created.is_empty() || !self.replaced.is_empty()
    }
}

/// Back up every target that synchronization is about to replace.
///
/// Returns number of backups made.
///
/// # Errors
///
/// - Return [`LinkError::Backup`] if a backup fails.
#[instrument(skip_all, level = "debug")]
pub fn backup_targets(
    links: &[ManagedLink],
    backups: &mut BackupManager,
    journal: &mut Journal,
) -> Result<usize> {
    let mut count = 0;
    for link in links {
        if !link.source.exists() || inspect(link) != TargetState::Occupied {
            continue;
        }

        let copy = backups.backup(&link.target)?;
        journal.record(Mutation::BackedUp {
            original: link.target.clone(),
            copy,
        });
        count += 1;
    }

    Ok(count)
}

/// Make every managed target a symlink to its source.
///
/// Callers are expected to have backed up occupied targets first through
/// [`backup_targets`].
///
/// # Errors
///
/// - Return [`LinkError::Parent`] if parent directory of target cannot be
///   created.
/// - Return [`LinkError::Remove`] if existing target cannot be removed.
/// - Return [`LinkError::Symlink`] if symlink cannot be created.
#[instrument(skip_all, level = "debug")]
pub fn sync_links(links: &[ManagedLink], journal: &mut Journal) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for link in links {
        if !link.source.exists() {
            warn!(
                "source {:?} missing from repository, skip {:?}",
                link.source.display(),
                link.target.display()
            );
            report.skipped.push(link.target.clone());
            continue;
        }

        match inspect(link) {
            TargetState::Linked => {
                debug!("{:?} already linked", link.target.display());
                report.unchanged.push(link.target.clone());
            }
            TargetState::Absent => {
                create_link(link, journal)?;
                report.created.push(link.target.clone());
            }
            TargetState::Occupied => {
                remove_entry(&link.target).map_err(|source| LinkError::Remove {
                    source,
                    target: link.target.clone(),
                })?;
                journal.record(Mutation::Removed {
                    target: link.target.clone(),
                });
                create_link(link, journal)?;
                report.replaced.push(link.target.clone());
            }
        }
    }

    Ok(report)
}

fn create_link(link: &ManagedLink, journal: &mut Journal) -> Result<()> {
    if let Some(parent) = link.target.parent() {
        mkdirp::mkdirp(parent).map_err(|source| LinkError::Parent {
            source,
            path: parent.to_path_buf(),
        })?;
    }

    symlink(&link.source, &link.target).map_err(|source| LinkError::Symlink {
        source,
        from: link.target.clone(),
        to: link.source.clone(),
    })?;
    journal.record(Mutation::Linked {
        target: link.target.clone(),
    });
    info!(
        "linked {:?} -> {:?}",
        link.target.display(),
        link.source.display()
    );

    Ok(())
}

/// Symlink synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Backup of existing target failed.
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// Parent directory of target cannot be created.
    #[error("failed to create parent directory {:?}", path.display())]
    Parent {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Existing target cannot be removed.
    #[error("failed to remove existing {:?}", target.display())]
    Remove {
        #[source]
        source: io::Error,
        target: PathBuf,
    },

    /// Symlink cannot be created.
    #[error("failed to link {:?} to {:?}", from.display(), to.display())]
    Symlink {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::{create_dir_all, read_to_string, write};
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        repo: PathBuf,
        home: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let repo = root.path().join("repo");
            let home = root.path().join("home");
            create_dir_all(repo.join("nvim")).unwrap();
            create_dir_all(&home).unwrap();
            write(repo.join("zshrc"), "zshrc from repo").unwrap();
            write(repo.join("nvim/init.lua"), "init from repo").unwrap();

            Self {
                _root: root,
                repo,
                home,
            }
        }

        fn links(&self) -> Vec<ManagedLink> {
            vec![
                ManagedLink::new(self.repo.join("zshrc"), self.home.join(".zshrc")),
                ManagedLink::new(self.repo.join("nvim"), self.home.join(".config/nvim")),
            ]
        }
    }

    #[test]
    fn sync_twice_is_idempotent() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let links = fixture.links();

        let mut journal = Journal::new();
        let first = sync_links(&links, &mut journal)?;
        assert_eq!(first.created.len(), 2);
        assert!(first.has_changes());

        let mut journal = Journal::new();
        let second = sync_links(&links, &mut journal)?;
        assert!(!second.has_changes());
        assert_eq!(second.unchanged.len(), 2);
        assert!(journal.is_empty());

        for link in &links {
            assert_eq!(inspect(link), TargetState::Linked);
            assert_eq!(read_link(&link.target)?, link.source);
        }
        assert_eq!(
            read_to_string(fixture.home.join(".config/nvim/init.lua"))?,
            "init from repo"
        );

        Ok(())
    }

    #[test]
    fn occupied_targets_are_backed_up_then_replaced() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let links = fixture.links();
        write(fixture.home.join(".zshrc"), "my old zshrc")?;
        create_dir_all(fixture.home.join(".config/nvim"))?;
        write(fixture.home.join(".config/nvim/init.vim"), "old vim")?;

        let mut backups = BackupManager::new(fixture.home.join("backup"));
        let mut journal = Journal::new();
        assert_eq!(backup_targets(&links, &mut backups, &mut journal)?, 2);
        let report = sync_links(&links, &mut journal)?;
        assert_eq!(report.replaced.len(), 2);

        assert_eq!(
            read_to_string(fixture.home.join("backup/.zshrc"))?,
            "my old zshrc"
        );
        assert_eq!(
            read_to_string(fixture.home.join("backup/nvim/init.vim"))?,
            "old vim"
        );
        assert_eq!(read_to_string(fixture.home.join(".zshrc"))?, "zshrc from repo");

        Ok(())
    }

    #[test]
    fn foreign_symlinks_are_replaced() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let links = fixture.links();
        symlink("/nowhere", fixture.home.join(".zshrc"))?;
        assert_eq!(inspect(&links[0]), TargetState::Occupied);

        let report = sync_links(&links, &mut Journal::new())?;
        assert_eq!(report.replaced, vec![fixture.home.join(".zshrc")]);
        assert_eq!(inspect(&links[0]), TargetState::Linked);

        Ok(())
    }

    #[test]
    fn missing_sources_are_skipped() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let links = vec![ManagedLink::new(
            fixture.repo.join("nope"),
            fixture.home.join(".nope"),
        )];

        let report = sync_links(&links, &mut Journal::new())?;
        assert_eq!(report.skipped, vec![fixture.home.join(".nope")]);
        assert!(fixture.home.join(".nope").symlink_metadata().is_err());

        Ok(())
    }
}
