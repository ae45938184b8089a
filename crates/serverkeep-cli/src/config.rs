use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serverkeep_core::{Channel, TerminalKind, VersionRequest, COMMAND_PLACEHOLDER};
use serverkeep_installer::DEFAULT_DOWNLOADER_URL;
use serverkeep_process::DEFAULT_RUNTIME_MAJOR;
use serverkeep_registry::DEFAULT_METADATA_URL_TEMPLATE;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "serverkeep.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) server_dir: Option<PathBuf>,
    pub(crate) channel: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) jvm_args: Option<Vec<String>>,
    pub(crate) terminal: Option<TerminalKind>,
    pub(crate) work_dir: Option<PathBuf>,
    pub(crate) runtime_version: Option<u32>,
    pub(crate) metadata_url: Option<String>,
    pub(crate) downloader_url: Option<String>,
}

impl ConfigFile {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse config")
    }

    /// Reads `path`, anchoring relative directories at the file's location.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let mut config = Self::parse(&raw)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.server_dir = config.server_dir.map(|dir| base.join(dir));
        config.work_dir = config.work_dir.map(|dir| base.join(dir));
        Ok(config)
    }
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Default, Clone)]
pub(crate) struct Overrides {
    pub(crate) config: Option<PathBuf>,
    pub(crate) server_dir: Option<PathBuf>,
    pub(crate) channel: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) jvm_args: Vec<String>,
    pub(crate) terminal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) server_dir: PathBuf,
    pub(crate) channel: Channel,
    pub(crate) version: VersionRequest,
    pub(crate) jvm_args: Vec<String>,
    pub(crate) terminal: Option<TerminalKind>,
    pub(crate) work_dir: PathBuf,
    pub(crate) runtime_version: u32,
    pub(crate) metadata_url: String,
    pub(crate) downloader_url: String,
}

impl Settings {
    pub(crate) fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => ConfigFile::load(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    ConfigFile::load(default_path)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        Self::merge(file, overrides)
    }

    pub(crate) fn merge(file: ConfigFile, overrides: &Overrides) -> Result<Self> {
        let terminal = match overrides.terminal.as_deref() {
            Some(raw) => Some(parse_terminal_flag(raw)?),
            None => file.terminal,
        };
        let jvm_args = if overrides.jvm_args.is_empty() {
            file.jvm_args.unwrap_or_default()
        } else {
            overrides.jvm_args.clone()
        };

        Ok(Self {
            server_dir: overrides
                .server_dir
                .clone()
                .or(file.server_dir)
                .unwrap_or_else(|| PathBuf::from("run")),
            channel: overrides
                .channel
                .clone()
                .or(file.channel)
                .map(Channel::new)
                .unwrap_or_default(),
            version: overrides
                .version
                .as_deref()
                .or(file.version.as_deref())
                .map(VersionRequest::parse)
                .unwrap_or_default(),
            jvm_args,
            terminal,
            work_dir: file
                .work_dir
                .unwrap_or_else(|| PathBuf::from("build/serverkeep/downloader")),
            runtime_version: file.runtime_version.unwrap_or(DEFAULT_RUNTIME_MAJOR),
            metadata_url: file
                .metadata_url
                .unwrap_or_else(|| DEFAULT_METADATA_URL_TEMPLATE.to_string()),
            downloader_url: file
                .downloader_url
                .unwrap_or_else(|| DEFAULT_DOWNLOADER_URL.to_string()),
        })
    }

    /// Terminal candidates for `run-interactive`, in launch order.
    pub(crate) fn terminal_kinds(&self) -> Vec<TerminalKind> {
        match &self.terminal {
            Some(kind) => vec![kind.clone()],
            None => serverkeep_core::default_terminal_kinds(),
        }
    }
}

/// A known terminal name, or a whitespace-separated custom template.
pub(crate) fn parse_terminal_flag(raw: &str) -> Result<TerminalKind> {
    if let Some(kind) = TerminalKind::parse(raw) {
        return Ok(kind);
    }
    let tokens = raw.split_whitespace().map(str::to_string).collect::<Vec<_>>();
    if tokens.len() > 1 || raw.contains(COMMAND_PLACEHOLDER) {
        return Ok(TerminalKind::Custom(tokens));
    }
    Err(anyhow!(
        "unknown terminal '{raw}' (expected a known terminal name or a template containing {COMMAND_PLACEHOLDER})"
    ))
}

/// Splits `--server-args` on whitespace.
pub(crate) fn split_server_args(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
