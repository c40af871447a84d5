// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Backup management.
//!
//! No pre-existing user file is ever lost. Anything sitting at a managed
//! target is _copied_ into the run's backup directory before the target is
//! replaced. Copies keep their original file name. Two targets with the same
//! name in different directories get distinct copies, the later one with a
//! numeric suffix, e.g., `config` and `config-1`.
//!
//! The backup directory is only created once the first backup is needed. It
//! is never cleaned up by dotstrap.

use std::{
    fs::{copy, create_dir, read_dir, read_link},
    io,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Copy files into a per-run backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    created: bool,
}

impl BackupManager {
    /// Construct new backup manager for backup directory.
    ///
    /// Does not create backup directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            created: false,
        }
    }

    /// Backup directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check if backup directory was created by this manager.
    pub fn is_used(&self) -> bool {
        self.created
    }

    /// Copy file, directory, or symlink at `path` into backup directory.
    ///
    /// Returns path of copy.
    ///
    /// # Errors
    ///
    /// - Return [`BackupError::CreateDir`] if backup directory cannot be
    ///   created.
    /// - Return [`BackupError::Copy`] if content cannot be copied.
    #[instrument(skip(self, path), level = "debug")]
    pub fn backup(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        self.ensure_dir()?;

        let name = path.file_name().ok_or_else(|| BackupError::NoFileName {
            path: path.to_path_buf(),
        })?;
        let dest = free_name(&self.dir, &name.to_string_lossy());
        copy_entry(path, &dest).map_err(|source| BackupError::Copy {
            source,
            from: path.to_path_buf(),
            to: dest.clone(),
        })?;
        info!("backed up {:?} to {:?}", path.display(), dest.display());

        Ok(dest)
    }

    fn ensure_dir(&mut self) -> Result<()> {
        if self.created {
            return Ok(());
        }

        mkdirp::mkdirp(&self.dir).map_err(|source| BackupError::CreateDir {
            source,
            path: self.dir.clone(),
        })?;
        self.created = true;
        info!("created backup directory {:?}", self.dir.display());

        Ok(())
    }
}

// INVARIANT: Never reuse a name, so every journal entry owns its copy.
fn free_name(dir: &Path, name: &str) -> PathBuf {
    let dest = dir.join(name);
    if dest.symlink_metadata().is_err() {
        return dest;
    }

    let mut suffix = 1;
    loop {
        let candidate = dir.join(format!("{name}-{suffix}"));
        if candidate.symlink_metadata().is_err() {
            debug!("backup {:?} taken, use {:?}", dest.display(), candidate.display());
            return candidate;
        }
        suffix += 1;
    }
}

/// Copy backed up content back to its original location.
///
/// # Errors
///
/// - Return [`io::Error`] if content cannot be copied.
pub fn restore(copy: impl AsRef<Path>, original: impl AsRef<Path>) -> io::Result<()> {
    if let Some(parent) = original.as_ref().parent() {
        mkdirp::mkdirp(parent)?;
    }

    copy_entry(copy.as_ref(), original.as_ref())
}

fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    let meta = from.symlink_metadata()?;
    if meta.file_type().is_symlink() {
        symlink(read_link(from)?, to)?;
    } else if meta.is_dir() {
        create_dir(to)?;
        for entry in read_dir(from)? {
            let entry = entry?;
            copy_entry(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        copy(from, to)?;
    }

    Ok(())
}

pub(crate) fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Backup error types.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Backup directory cannot be created.
    #[error("failed to create backup directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Content cannot be copied into backup directory.
    #[error("failed to back up {:?} to {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Path has no file name to back up under.
    #[error("cannot back up {:?} without a file name", path.display())]
    NoFileName { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = BackupError> = std::result::Result<T, E>;
