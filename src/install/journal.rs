// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Mutation journal.
//!
//! Every file system change made during the mutation phase of a run is
//! recorded here, in order. If a step fails, the journal is replayed in
//! reverse to put the home directory back the way it was.

use crate::install::backup::restore;

use std::{
    fs::{remove_dir_all, remove_file},
    path::PathBuf,
};
use tracing::{error, info, instrument};

/// Single recorded file system change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Original content at `original` was copied to `copy`.
    BackedUp { original: PathBuf, copy: PathBuf },

    /// Existing content at `target` was removed.
    Removed { target: PathBuf },

    /// Symlink was created at `target`.
    Linked { target: PathBuf },

    /// New file was created at `path`.
    Created { path: PathBuf },
}

/// Ordered record of mutations made by current run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Journal {
    entries: Vec<Mutation>,
}

impl Journal {
    /// Construct new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation.
    pub fn record(&mut self, mutation: Mutation) {
        self.entries.push(mutation);
    }

    /// List recorded mutations in order.
    pub fn entries(&self) -> &[Mutation] {
        &self.entries
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Undo recorded mutations, newest first.
    ///
    /// Best effort. Each failure is logged and counted, and replay continues
    /// with the next entry. Returns the number of entries that could not be
    /// undone. The journal is drained either way.
    #[instrument(skip(self), level = "debug")]
    pub fn rollback(&mut self) -> usize {
        let mut failures = 0;
        while let Some(mutation) = self.entries.pop() {
            if let Err(err) = undo(&mutation) {
                error!("rollback of {mutation:?} failed: {err}");
                failures += 1;
            }
        }

        failures
    }
}

fn undo(mutation: &Mutation) -> std::io::Result<()> {
    match mutation {
        Mutation::Linked { target } => {
            if target.is_symlink() {
                info!("remove link {:?}", target.display());
                remove_file(target)?;
            }
        }
        Mutation::Created { path } => {
            if path.symlink_metadata().is_ok() {
                info!("remove created file {:?}", path.display());
                remove_file(path)?;
            }
        }
        Mutation::Removed { .. } => {
            // Content comes back through the matching backup entry.
        }
        Mutation::BackedUp { original, copy } => {
            match original.symlink_metadata() {
                Ok(meta) if meta.file_type().is_symlink() => remove_file(original)?,
                Ok(meta) if meta.is_dir() => remove_dir_all(original)?,
                Ok(_) => remove_file(original)?,
                Err(_) => {}
            }

            info!("restore {:?} from {:?}", original.display(), copy.display());
            restore(copy, original)?;
        }
    }

    Ok(())
}
