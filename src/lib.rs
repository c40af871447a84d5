// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bootstrap a personal dotfile repository onto a machine.
//!
//! Dotstrap takes a checked out dotfile repository and wires it into the
//! current user's home directory: every managed file becomes a symlink into
//! the repository, a private secrets file is provisioned, shared Git
//! configuration is included, and optional shell tooling is offered. Runs are
//! idempotent, so running dotstrap twice changes nothing the second time.
//!
//! # Safety Rails
//!
//! - Refuse to run as the superuser.
//! - Never overwrite a user file without first copying it into a per-run
//!   backup directory.
//! - Roll back every change made so far if a step fails mid-run.
//! - Never ask questions when running unattended, e.g., in CI or a container.
//!
//! The entry point is [`Installer`], which drives a run through its stages
//! and reports a [`RunSummary`].

pub mod config;
pub mod env;
pub mod exec;
pub mod install;
pub mod path;
pub mod preflight;
pub mod prompt;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[doc(inline)]
pub use crate::{
    config::{Layout, Manifest},
    env::{Environment, Platform},
    exec::{CommandRunner, CommandSpec, SystemRunner},
    install::{Installer, RunOutcome, RunSummary, Stage},
    preflight::PreflightError,
    prompt::{InquirePrompter, Prompter, Unattended},
};
