// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Scripted stand-ins for external commands and user prompts.
//!
//! Built for unit tests, and for integration tests through the `testing`
//! feature.

use crate::{
    exec::{CommandRunner, CommandSpec, ExecError, Result as ExecResult},
    prompt::{PromptError, Prompter, Result as PromptResult},
};

use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    path::{Path, PathBuf},
};

type Predicate = Box<dyn Fn(&CommandSpec) -> bool>;

/// Command runner that records calls instead of spawning processes.
#[derive(Default)]
pub struct FakeRunner {
    tools: BTreeMap<String, PathBuf>,
    failures: Vec<(String, Predicate)>,
    effects: Vec<(String, PathBuf)>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeRunner {
    /// Pretend each tool lives in `/usr/bin`.
    pub fn with_tools<'a>(tools: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tools: tools
                .into_iter()
                .map(|tool| (tool.to_string(), Path::new("/usr/bin").join(tool)))
                .collect(),
            ..Self::default()
        }
    }

    /// Fail invocations of program that match predicate.
    pub fn failing(
        mut self,
        program: &str,
        predicate: impl Fn(&CommandSpec) -> bool + 'static,
    ) -> Self {
        self.failures.push((program.to_string(), Box::new(predicate)));
        self
    }

    /// Create directory whenever program succeeds.
    pub fn creating(mut self, program: &str, dir: impl AsRef<Path>) -> Self {
        self.effects
            .push((program.to_string(), dir.as_ref().to_path_buf()));
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Program name of every command run so far, in order.
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.program.clone())
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> ExecResult<String> {
        self.calls.borrow_mut().push(spec.clone());

        let fails = self
            .failures
            .iter()
            .any(|(program, predicate)| program == &spec.program && predicate(spec));
        if fails {
            return Err(ExecError::Failed {
                command: spec.to_string(),
                message: "stderr: scripted failure".into(),
            });
        }

        for (program, dir) in &self.effects {
            if program == &spec.program {
                mkdirp::mkdirp(dir).map_err(|source| ExecError::Spawn {
                    source,
                    command: spec.to_string(),
                })?;
            }
        }

        Ok(String::new())
    }

    fn locate(&self, tool: &str) -> Option<PathBuf> {
        self.tools.get(tool).cloned()
    }
}

/// Prompter that answers from a script.
///
/// Running out of answers is an error, so unexpected questions fail loudly.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    confirms: VecDeque<bool>,
    texts: VecDeque<String>,

    /// Every question asked so far, in order.
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(confirms: impl IntoIterator<Item = bool>) -> Self {
        Self {
            confirms: confirms.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queue text answers. An empty answer means the question is skipped.
    pub fn with_text<'a>(mut self, texts: impl IntoIterator<Item = &'a str>) -> Self {
        self.texts.extend(texts.into_iter().map(ToString::to_string));
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str, _default: bool) -> PromptResult<bool> {
        self.asked.push(message.to_string());
        self.confirms
            .pop_front()
            .ok_or_else(|| PromptError::Unattended {
                question: message.to_string(),
            })
    }

    fn text(&mut self, message: &str) -> PromptResult<Option<String>> {
        self.asked.push(message.to_string());
        let answer = self.texts.pop_front().ok_or_else(|| PromptError::Unattended {
            question: message.to_string(),
        })?;

        Ok(Some(answer).filter(|answer| !answer.is_empty()))
    }
}
