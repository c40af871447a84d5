// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod integration;

use dotstrap::{testing::FakeRunner, Environment, Installer, Manifest, Platform, Prompter};

use anyhow::Result;
use indoc::indoc;
use std::{
    collections::HashMap,
    fs::{create_dir_all, read_dir, write},
    path::PathBuf,
};
use tempfile::TempDir;

/// Temporary home directory plus dotfile repository checkout.
pub(crate) struct Sandbox {
    _root: TempDir,
    pub(crate) home: PathBuf,
    pub(crate) repo: PathBuf,
}

impl Sandbox {
    pub(crate) fn new() -> Result<Self> {
        let root = TempDir::new()?;
        let home = root.path().join("home");
        let repo = root.path().join("repo");
        create_dir_all(&home)?;
        create_dir_all(repo.join("shell"))?;
        create_dir_all(repo.join("config/nvim"))?;
        create_dir_all(repo.join("git"))?;

        write(
            repo.join("dotstrap.toml"),
            indoc! {r#"
                [[link]]
                source = "shell/zshrc"
                target = "~/.zshrc"

                [[link]]
                source = "shell/aliases"
                target = "~/.aliases"

                [[link]]
                source = "config/nvim"
                target = "~/.config/nvim"

                [[link]]
                source = "shell/missing"
                target = "~/.missing"

                [shell]
                login_shell = "zsh"
                framework_dir = "~/.oh-my-zsh"
                framework_installer = "https://example.com/install.sh"
            "#},
        )?;
        write(repo.join("shell/zshrc"), "source ~/.aliases\n")?;
        write(repo.join("shell/aliases"), "alias ll='ls -l'\n")?;
        write(repo.join("config/nvim/init.lua"), "vim.o.number = true\n")?;
        write(repo.join("git/gitconfig"), "[alias]\n\tst = status\n")?;
        write(repo.join("secrets.example"), "export API_TOKEN=\n")?;

        Ok(Self {
            _root: root,
            home,
            repo,
        })
    }

    pub(crate) fn env(&self, interactive: bool) -> Environment {
        Environment {
            home: self.home.clone(),
            repo: self.repo.clone(),
            interactive,
            platform: Platform::Linux,
            superuser: false,
            login_shell: Some("/bin/bash".into()),
            vars: HashMap::new(),
        }
    }

    /// Runner that finds every tool a full run may need.
    pub(crate) fn runner(&self) -> FakeRunner {
        FakeRunner::with_tools(["git", "curl", "sh", "bash", "chsh", "zsh"])
    }

    pub(crate) fn installer<P: Prompter>(
        &self,
        env: Environment,
        stamp: &str,
        runner: FakeRunner,
        prompter: P,
    ) -> Result<Installer<FakeRunner, P>> {
        let layout = Manifest::load(&self.repo)?.resolve(&env)?;
        let backup_dir = dotstrap::path::backup_dir_path(&self.home, stamp);
        Ok(Installer::new(env, layout, backup_dir, runner, prompter))
    }

    pub(crate) fn framework_dir(&self) -> PathBuf {
        self.home.join(".oh-my-zsh")
    }

    pub(crate) fn backup_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in read_dir(&self.home)? {
            let entry = entry?;
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(dotstrap::path::BACKUP_DIR_PREFIX)
            {
                dirs.push(entry.path());
            }
        }

        Ok(dirs)
    }
}
