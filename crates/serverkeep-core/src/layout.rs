use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ArtifactKind;

pub const STATE_FILE_NAME: &str = ".hytale-setup-state.json";
pub const ARGS_FILE_NAME: &str = ".hytale-jvm.args";

/// Paths inside one installation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    server_dir: PathBuf,
}

impl InstallLayout {
    pub fn new(server_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_dir: server_dir.into(),
        }
    }

    pub fn server_dir(&self) -> &Path {
        &self.server_dir
    }

    pub fn server_jar_path(&self) -> PathBuf {
        self.server_dir.join("Server").join("HytaleServer.jar")
    }

    pub fn assets_zip_path(&self) -> PathBuf {
        self.server_dir.join("Assets.zip")
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::ServerJar => self.server_jar_path(),
            ArtifactKind::AssetsZip => self.assets_zip_path(),
        }
    }

    pub fn start_sh_path(&self) -> PathBuf {
        self.server_dir.join("start.sh")
    }

    pub fn start_bat_path(&self) -> PathBuf {
        self.server_dir.join("start.bat")
    }

    /// Launcher script for the host platform.
    pub fn platform_script_path(&self) -> PathBuf {
        if cfg!(windows) {
            self.start_bat_path()
        } else {
            self.start_sh_path()
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.server_dir.join(STATE_FILE_NAME)
    }

    pub fn args_path(&self) -> PathBuf {
        self.server_dir.join(ARGS_FILE_NAME)
    }

    /// Both artifacts exist and at least one launcher script exists.
    pub fn is_installed(&self) -> bool {
        let has_script = self.start_bat_path().exists() || self.start_sh_path().exists();
        self.server_jar_path().exists() && self.assets_zip_path().exists() && has_script
    }

    pub fn missing_artifacts(&self) -> Vec<PathBuf> {
        ArtifactKind::ALL
            .iter()
            .map(|kind| self.artifact_path(*kind))
            .filter(|path| !path.exists())
            .collect()
    }

    pub fn ensure_server_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.server_dir)
            .with_context(|| format!("failed to create {}", self.server_dir.display()))
    }
}
