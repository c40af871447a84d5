// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User prompts.
//!
//! Prompts are only ever issued in interactive mode. Steps ask through a
//! [`Prompter`] so that a run can be driven by scripted answers.

use inquire::{Confirm, Text};

/// Ask the user questions.
pub trait Prompter {
    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if question cannot be answered.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Ask for a line of text. An empty answer yields `None`.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if question cannot be answered.
    fn text(&mut self, message: &str) -> Result<Option<String>>;
}

/// Terminal prompts through inquire.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl InquirePrompter {
    /// Construct new terminal prompter.
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for InquirePrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }

    fn text(&mut self, message: &str) -> Result<Option<String>> {
        let answer = Text::new(message).prompt()?;
        let answer = answer.trim();
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(answer.to_string()))
        }
    }
}

/// Prompter that refuses every question.
///
/// Used for unattended runs, where asking anything is a bug.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unattended;

impl Prompter for Unattended {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        Err(PromptError::Unattended {
            question: message.to_string(),
        })
    }

    fn text(&mut self, message: &str) -> Result<Option<String>> {
        Err(PromptError::Unattended {
            question: message.to_string(),
        })
    }
}

/// Prompt error types.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Terminal prompt failed or was cancelled.
    #[error(transparent)]
    Inquire(#[from] inquire::InquireError),

    /// Question asked while running unattended.
    #[error("cannot ask {question:?} in non-interactive mode")]
    Unattended { question: String },
}

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;
