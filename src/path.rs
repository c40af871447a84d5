// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for files that dotstrap needs to
//! create, link, or inspect in some way.

use std::path::{Path, PathBuf};

/// Name of the manifest file expected at the top-level of a dotfile
/// repository checkout.
pub const MANIFEST_FILE: &str = "dotstrap.toml";

/// Name of the append-only install log placed in the home directory.
pub const INSTALL_LOG_FILE: &str = ".dotfiles_install.log";

/// Prefix shared by every backup directory placed in the home directory.
pub const BACKUP_DIR_PREFIX: &str = ".dotfiles_backup_";

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine absolute path to the install log inside a home directory.
pub fn install_log_path(home: impl AsRef<Path>) -> PathBuf {
    home.as_ref().join(INSTALL_LOG_FILE)
}

/// Determine a unique backup directory path for a run started at `stamp`.
///
/// Uses `<home>/.dotfiles_backup_<stamp>`. If that path is already taken,
/// then a numeric suffix is appended until a free name is found. Does not
/// create anything.
pub fn backup_dir_path(home: impl AsRef<Path>, stamp: &str) -> PathBuf {
    let base = home.as_ref().join(format!("{BACKUP_DIR_PREFIX}{stamp}"));
    if base.symlink_metadata().is_err() {
        return base;
    }

    let mut suffix = 1;
    loop {
        let candidate = home
            .as_ref()
            .join(format!("{BACKUP_DIR_PREFIX}{stamp}-{suffix}"));
        if candidate.symlink_metadata().is_err() {
            return candidate;
        }
        suffix += 1;
    }
}

/// Resolve a shell-expanded path against a base directory.
///
/// Absolute paths are returned as-is. Relative paths are joined onto `base`.
pub fn resolve_against(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    if path.as_ref().is_absolute() {
        path.as_ref().to_path_buf()
    } else {
        base.as_ref().join(path)
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
