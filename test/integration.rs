// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::Sandbox;

use dotstrap::{
    install::{secrets::file_mode, shell::ShellSwitch},
    testing::ScriptedPrompter,
    PreflightError, RunOutcome, Stage, Unattended,
};

use anyhow::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::{
    fs::{create_dir_all, read_link, read_to_string, remove_file, set_permissions, write, Permissions},
    os::unix::fs::PermissionsExt,
};

#[test]
fn fresh_interactive_run_declining_everything() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let runner = sandbox.runner().creating("sh", sandbox.framework_dir());
    let prompter = ScriptedPrompter::new([false, false, false]).with_text(["", ""]);
    let mut installer =
        sandbox.installer(sandbox.env(true), "20250101_000000", runner, prompter)?;

    let summary = installer.run()?;
    assert!(summary.outcome.is_success(), "{:?}", summary.outcome);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(installer.stage(), Stage::Success);

    assert_eq!(
        read_link(sandbox.home.join(".zshrc"))?,
        sandbox.repo.join("shell/zshrc")
    );
    assert_eq!(
        read_link(sandbox.home.join(".config/nvim"))?,
        sandbox.repo.join("config/nvim")
    );
    assert!(!sandbox.home.join(".missing").exists());
    assert_eq!(summary.links.created.len(), 3);
    assert_eq!(summary.links.skipped.len(), 1);

    assert_eq!(file_mode(sandbox.home.join(".secrets"))?, 0o600);
    assert!(read_to_string(sandbox.home.join(".gitconfig"))?.contains("repo/git/gitconfig"));
    assert!(sandbox.backup_dirs()?.is_empty());

    assert_eq!(summary.tools.declined.len(), 2);
    assert_eq!(summary.shell, Some(ShellSwitch::Declined));
    assert_eq!(installer.prompter().asked.len(), 5);
    assert_eq!(installer.runner().programs(), vec!["sh".to_string()]);

    Ok(())
}

#[test]
fn pre_existing_file_is_backed_up_then_replaced() -> Result<()> {
    let sandbox = Sandbox::new()?;
    create_dir_all(sandbox.framework_dir())?;
    write(sandbox.home.join(".zshrc"), "# hand written zshrc\n")?;

    let mut installer = sandbox.installer(
        sandbox.env(false),
        "20250101_000000",
        sandbox.runner(),
        Unattended,
    )?;
    let summary = installer.run()?;
    assert!(summary.outcome.is_success(), "{:?}", summary.outcome);
    assert_eq!(summary.backups, 1);
    assert_eq!(summary.links.replaced, vec![sandbox.home.join(".zshrc")]);

    let backup_dir = summary.backup_dir.expect("backup directory");
    assert_eq!(
        read_to_string(backup_dir.join(".zshrc"))?,
        "# hand written zshrc\n"
    );
    assert!(sandbox.home.join(".zshrc").is_symlink());
    assert_eq!(
        read_to_string(sandbox.home.join(".zshrc"))?,
        "source ~/.aliases\n"
    );

    Ok(())
}

#[test]
fn second_run_changes_nothing() -> Result<()> {
    let sandbox = Sandbox::new()?;
    create_dir_all(sandbox.framework_dir())?;
    write(sandbox.home.join(".aliases"), "alias g=git\n")?;

    let mut first = sandbox.installer(
        sandbox.env(false),
        "20250101_000000",
        sandbox.runner(),
        Unattended,
    )?;
    assert!(first.run()?.outcome.is_success());
    let gitconfig = read_to_string(sandbox.home.join(".gitconfig"))?;

    let mut second = sandbox.installer(
        sandbox.env(false),
        "20250101_000001",
        sandbox.runner(),
        Unattended,
    )?;
    let summary = second.run()?;
    assert!(summary.outcome.is_success(), "{:?}", summary.outcome);
    assert!(!summary.links.has_changes());
    assert_eq!(summary.links.unchanged.len(), 3);
    assert_eq!(summary.backup_dir, None);
    assert!(!summary.git.include_added);
    assert_eq!(read_to_string(sandbox.home.join(".gitconfig"))?, gitconfig);
    assert_eq!(sandbox.backup_dirs()?.len(), 1);

    Ok(())
}

#[test]
fn loose_secrets_permissions_are_tightened() -> Result<()> {
    let sandbox = Sandbox::new()?;
    create_dir_all(sandbox.framework_dir())?;
    let secrets = sandbox.home.join(".secrets");
    write(&secrets, "export API_TOKEN=abcdefgh12345\n")?;
    set_permissions(&secrets, Permissions::from_mode(0o777))?;

    let mut installer = sandbox.installer(
        sandbox.env(false),
        "20250101_000000",
        sandbox.runner(),
        Unattended,
    )?;
    let summary = installer.run()?;
    assert!(summary.outcome.is_success(), "{:?}", summary.outcome);
    assert!(summary.secrets.map(|report| report.corrected).unwrap_or(false));
    assert_eq!(file_mode(&secrets)?, 0o600);
    assert_eq!(
        read_to_string(&secrets)?,
        "export API_TOKEN=abcdefgh12345\n"
    );

    Ok(())
}

#[test]
fn failure_mid_run_rolls_everything_back() -> Result<()> {
    let sandbox = Sandbox::new()?;
    create_dir_all(sandbox.framework_dir())?;
    write(sandbox.home.join(".zshrc"), "# hand written zshrc\n")?;

    // Template that cannot be copied breaks the run after links are in place.
    remove_file(sandbox.repo.join("secrets.example"))?;
    create_dir_all(sandbox.repo.join("secrets.example"))?;

    let mut installer = sandbox.installer(
        sandbox.env(false),
        "20250101_000000",
        sandbox.runner(),
        Unattended,
    )?;
    let summary = installer.run()?;
    assert!(matches!(
        summary.outcome,
        RunOutcome::RolledBack {
            stage: Stage::Secrets,
            ..
        }
    ));
    assert_eq!(summary.exit_code(), 3);
    assert_eq!(summary.rollback_failures, 0);
    assert_eq!(installer.stage(), Stage::Failed);

    let zshrc = sandbox.home.join(".zshrc");
    assert!(!zshrc.is_symlink());
    assert_eq!(read_to_string(&zshrc)?, "# hand written zshrc\n");
    assert!(sandbox.home.join(".aliases").symlink_metadata().is_err());
    assert!(sandbox.home.join(".config/nvim").symlink_metadata().is_err());
    assert!(!sandbox.home.join(".secrets").exists());

    Ok(())
}

#[test]
fn same_named_targets_are_each_restored_on_rollback() -> Result<()> {
    let sandbox = Sandbox::new()?;
    create_dir_all(sandbox.framework_dir())?;
    write(
        sandbox.repo.join("dotstrap.toml"),
        indoc! {r#"
            [[link]]
            source = "config/a"
            target = "~/.config/a/config"

            [[link]]
            source = "config/b"
            target = "~/.config/b/config"

            [shell]
            login_shell = "zsh"
            framework_dir = "~/.oh-my-zsh"
        "#},
    )?;
    write(sandbox.repo.join("config/a"), "managed a\n")?;
    write(sandbox.repo.join("config/b"), "managed b\n")?;
    create_dir_all(sandbox.home.join(".config/a"))?;
    create_dir_all(sandbox.home.join(".config/b"))?;
    write(sandbox.home.join(".config/a/config"), "user a original\n")?;
    write(sandbox.home.join(".config/b/config"), "user b original\n")?;

    remove_file(sandbox.repo.join("secrets.example"))?;
    create_dir_all(sandbox.repo.join("secrets.example"))?;

    let mut installer = sandbox.installer(
        sandbox.env(false),
        "20250101_000000",
        sandbox.runner(),
        Unattended,
    )?;
    let summary = installer.run()?;
    assert!(matches!(
        summary.outcome,
        RunOutcome::RolledBack {
            stage: Stage::Secrets,
            ..
        }
    ));
    assert_eq!(summary.exit_code(), 3);
    assert_eq!(summary.rollback_failures, 0);

    for (name, content) in [("a", "user a original\n"), ("b", "user b original\n")] {
        let target = sandbox.home.join(".config").join(name).join("config");
        assert!(!target.is_symlink());
        assert_eq!(read_to_string(&target)?, content);
    }

    let backups = sandbox.backup_dirs()?;
    assert_eq!(backups.len(), 1);
    assert_eq!(read_to_string(backups[0].join("config"))?, "user a original\n");
    assert_eq!(read_to_string(backups[0].join("config-1"))?, "user b original\n");

    Ok(())
}

#[test]
fn unattended_run_never_asks_or_installs_tools() -> Result<()> {
    let sandbox = Sandbox::new()?;
    write(
        sandbox.home.join(".netrc"),
        "machine example.com password hunter2hunter2\nexport TOKEN=abcdefgh12345\n",
    )?;

    let runner = sandbox.runner().creating("sh", sandbox.framework_dir());
    let mut installer =
        sandbox.installer(sandbox.env(false), "20250101_000000", runner, Unattended)?;
    let summary = installer.run()?;
    assert!(summary.outcome.is_success(), "{:?}", summary.outcome);
    assert!(summary.tools.skipped);
    assert_eq!(summary.shell, Some(ShellSwitch::Skipped));
    assert!(summary.git.identity_set.is_empty());
    assert_eq!(installer.runner().programs(), vec!["sh".to_string()]);

    Ok(())
}

#[test]
fn failed_validation_keeps_changes() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let runner = sandbox.runner().failing("sh", |_| true);
    let mut installer =
        sandbox.installer(sandbox.env(false), "20250101_000000", runner, Unattended)?;

    let summary = installer.run()?;
    match &summary.outcome {
        RunOutcome::ValidationFailed { errors } => assert_eq!(errors.len(), 1),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(summary.exit_code(), 2);
    assert_eq!(installer.stage(), Stage::Failed);
    assert!(sandbox.home.join(".zshrc").is_symlink());
    assert!(sandbox.home.join(".secrets").exists());

    Ok(())
}

#[test]
fn superuser_is_refused_before_any_change() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let mut env = sandbox.env(false);
    env.superuser = true;

    let mut installer = sandbox.installer(env, "20250101_000000", sandbox.runner(), Unattended)?;
    let result = installer.run();
    assert!(matches!(result, Err(PreflightError::Superuser)));
    assert_eq!(installer.stage(), Stage::Failed);
    assert!(sandbox.home.join(".zshrc").symlink_metadata().is_err());
    assert!(sandbox.backup_dirs()?.is_empty());
    assert!(installer.runner().programs().is_empty());

    Ok(())
}
