// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the `dotstrap.toml` manifest that sits at the
//! top-level of a dotfile repository checkout. The manifest lists the managed
//! file set, and where the secrets file, shared Git configuration, and shell
//! framework live. Every section is optional. Missing sections fall back to
//! sensible defaults for a typical zsh setup.
//!
//! # Manifest versus Layout
//!
//! A [`Manifest`] keeps paths exactly as written, e.g., `~/.zshrc`. Before an
//! installation run can use it, the manifest is resolved into a [`Layout`]
//! against an [`Environment`]. Resolution performs shell expansion with the
//! environment's home directory and variable snapshot, and turns relative
//! paths into absolute ones.

use crate::{env::Environment, path::resolve_against};

use serde::{Deserialize, Serialize};
use std::{
    env::VarError,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

/// Dotfile repository manifest.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Managed file set.
    #[serde(rename = "link", default = "default_links")]
    pub links: Vec<LinkEntry>,

    /// Secrets file settings.
    #[serde(default)]
    pub secrets: SecretsSettings,

    /// Shared Git configuration settings.
    #[serde(default)]
    pub git: GitSettings,

    /// Login shell and shell framework settings.
    #[serde(default)]
    pub shell: ShellSettings,

    /// Secret-pattern scan bounds.
    #[serde(default)]
    pub scan: ScanSettings,

    /// Optional tooling.
    #[serde(default)]
    pub tools: ToolSettings,
}

impl Manifest {
    /// Load manifest from top-level of repository checkout.
    ///
    /// Falls back to the default manifest if the repository does not carry a
    /// manifest file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if manifest exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if manifest is malformed.
    pub fn load(repo: impl AsRef<Path>) -> Result<Self> {
        let path = repo.as_ref().join(crate::path::MANIFEST_FILE);
        if !path.exists() {
            info!("no manifest at {:?}, using default layout", path.display());
            return Ok(Self::default());
        }

        debug!("load manifest {:?}", path.display());
        read_to_string(&path)
            .map_err(|source| ConfigError::Read {
                source,
                path: path.clone(),
            })?
            .parse()
    }

    /// Resolve manifest into absolute layout for target environment.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ShellExpansion`] if a path refers to an unset
    ///   variable.
    pub fn resolve(&self, env: &Environment) -> Result<Layout> {
        let links = self
            .links
            .iter()
            .map(|entry| {
                Ok(ManagedLink {
                    source: resolve_against(&env.repo, expand(&entry.source, env)?),
                    target: resolve_against(&env.home, expand(&entry.target, env)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let secrets = SecretsLayout {
            path: resolve_against(&env.home, expand(&self.secrets.path, env)?),
            template: self
                .secrets
                .template
                .as_ref()
                .map(|template| expand(template, env).map(|path| resolve_against(&env.repo, path)))
                .transpose()?,
        };

        let git = GitLayout {
            include: self
                .git
                .include
                .as_ref()
                .map(|include| expand(include, env).map(|path| resolve_against(&env.repo, path)))
                .transpose()?,
            config: resolve_against(&env.home, expand(&self.git.config, env)?),
        };

        let shell = ShellLayout {
            login_shell: self.shell.login_shell.clone(),
            framework_dir: resolve_against(&env.home, expand(&self.shell.framework_dir, env)?),
            framework_installer: self.shell.framework_installer.clone(),
        };

        Ok(Layout {
            links,
            secrets,
            git,
            shell,
            scan: self.scan.clone(),
            tools: self.tools.optional.clone(),
        })
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            links: default_links(),
            secrets: SecretsSettings::default(),
            git: GitSettings::default(),
            shell: ShellSettings::default(),
            scan: ScanSettings::default(),
            tools: ToolSettings::default(),
        }
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Managed pair as written in manifest.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkEntry {
    /// Path relative to repository root.
    pub source: String,

    /// Path in home directory.
    pub target: String,
}

impl LinkEntry {
    /// Construct new link entry.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Secrets file settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretsSettings {
    /// Location of secrets file.
    pub path: String,

    /// Repository template to seed secrets file from.
    pub template: Option<String>,
}

impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            path: "~/.secrets".into(),
            template: Some("secrets.example".into()),
        }
    }
}

/// Shared Git configuration settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitSettings {
    /// Repository file to include from global Git configuration.
    pub include: Option<String>,

    /// Global Git configuration file to edit.
    pub config: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            include: Some("git/gitconfig".into()),
            config: "~/.gitconfig".into(),
        }
    }
}

/// Login shell and shell framework settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Name of shell binary to use as login shell.
    pub login_shell: String,

    /// Where the shell framework is installed.
    pub framework_dir: String,

    /// URL of unattended shell framework installer script.
    pub framework_installer: String,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            login_shell: "zsh".into(),
            framework_dir: "~/.oh-my-zsh".into(),
            framework_installer:
                "https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh".into(),
        }
    }
}

/// Bounds for secret-pattern scan.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Maximum directory depth to descend into.
    pub max_depth: usize,

    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_file_size: 1024 * 1024,
        }
    }
}

/// Optional tooling settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Version managers to offer installing.
    pub optional: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            optional: vec!["fnm".into(), "pyenv".into()],
        }
    }
}

/// Manifest resolved against an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub links: Vec<ManagedLink>,
    pub secrets: SecretsLayout,
    pub git: GitLayout,
    pub shell: ShellLayout,
    pub scan: ScanSettings,
    pub tools: Vec<String>,
}

/// Managed `(source, target)` pair with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedLink {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl ManagedLink {
    /// Construct new managed link.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsLayout {
    pub path: PathBuf,
    pub template: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLayout {
    pub include: Option<PathBuf>,
    pub config: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLayout {
    pub login_shell: String,
    pub framework_dir: PathBuf,
    pub framework_installer: String,
}

fn default_links() -> Vec<LinkEntry> {
    vec![
        LinkEntry::new("shell/zshrc", "~/.zshrc"),
        LinkEntry::new("shell/bashrc", "~/.bashrc"),
        LinkEntry::new("shell/aliases", "~/.aliases"),
        LinkEntry::new("shell/functions", "~/.functions"),
        LinkEntry::new("config/starship.toml", "~/.config/starship.toml"),
        LinkEntry::new("config/nvim", "~/.config/nvim"),
    ]
}

fn expand(input: &str, env: &Environment) -> Result<PathBuf> {
    shellexpand::full_with_context(
        input,
        || Some(env.home.to_string_lossy().into_owned()),
        |var| -> std::result::Result<Option<String>, VarError> {
            match env.var(var) {
                Some(value) => Ok(Some(value.to_string())),
                None if var == "HOME" => Ok(Some(env.home.to_string_lossy().into_owned())),
                None => Err(VarError::NotPresent),
            }
        },
    )
    .map(|expanded| PathBuf::from(expanded.into_owned()))
    .map_err(ConfigError::ShellExpansion)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read manifest file.
    #[error("failed to read manifest at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
