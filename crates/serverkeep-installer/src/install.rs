use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serverkeep_core::{
    Channel, InstallLayout, InstallationRecord, Report, Reporter, VersionLookup, VersionRequest,
};
use serverkeep_registry::{extract_zip, Downloader};

use crate::fs_utils::{recreate_dir, remove_dir_all_with_retry, RetryPolicy};
use crate::scripts::{ensure_scripts_patched, write_args_file};
use crate::staleness::InstallRequest;
use crate::state::save_installation_record;

pub const DEFAULT_DOWNLOADER_URL: &str = "https://downloader.hytale.com/hytale-downloader.zip";

const DOWNLOADER_ARCHIVE_NAME: &str = "hytale-downloader.zip";
const BUNDLE_FILE_NAME: &str = "hytale-server-assets.zip";

/// Produces the server bundle archive for a channel inside `work_dir`.
pub trait BundleSource {
    fn stage_bundle(
        &self,
        channel: &Channel,
        work_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<PathBuf>;
}

/// Stages the bundle with the vendor's own downloader tool.
pub struct OfficialDownloaderBundle<D> {
    downloader: D,
    downloader_url: String,
}

impl<D: Downloader> OfficialDownloaderBundle<D> {
    pub fn new(downloader: D) -> Self {
        Self {
            downloader,
            downloader_url: DEFAULT_DOWNLOADER_URL.to_string(),
        }
    }

    pub fn with_downloader_url(mut self, url: impl Into<String>) -> Self {
        self.downloader_url = url.into();
        self
    }
}

impl<D: Downloader> BundleSource for OfficialDownloaderBundle<D> {
    fn stage_bundle(
        &self,
        channel: &Channel,
        work_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<PathBuf> {
        let archive = work_dir.join(DOWNLOADER_ARCHIVE_NAME);
        reporter.report(Report::InstallStep {
            step: "downloading server downloader".to_string(),
        });
        self.downloader.fetch(&self.downloader_url, &archive)?;

        reporter.report(Report::InstallStep {
            step: "extracting server downloader".to_string(),
        });
        self.downloader.extract_archive(&archive, work_dir)?;

        let executable_name = downloader_executable_name();
        let executable = find_file_ignore_case(work_dir, executable_name)?.ok_or_else(|| {
            anyhow!(
                "could not find {executable_name} after extraction in {}; found files: {}",
                work_dir.display(),
                list_relative_files(work_dir).join(", ")
            )
        })?;
        mark_executable(&executable)?;

        let mut args = vec!["-download-path".to_string(), BUNDLE_FILE_NAME.to_string()];
        if channel.is_pre_release() {
            args.push("-patchline".to_string());
            args.push("pre-release".to_string());
        }

        reporter.report(Report::InstallStep {
            step: format!("running server downloader ({channel})"),
        });
        let status = Command::new(&executable)
            .args(&args)
            .current_dir(work_dir)
            .status()
            .with_context(|| format!("failed to start downloader: {}", executable.display()))?;
        if !status.success() {
            bail!(
                "downloader {} exited with {status}",
                executable.display()
            );
        }

        let bundle = work_dir.join(BUNDLE_FILE_NAME);
        if !bundle.exists() {
            bail!(
                "downloader finished but produced no bundle at {}",
                bundle.display()
            );
        }
        Ok(bundle)
    }
}

/// Platform-specific name of the vendor downloader executable.
pub fn downloader_executable_name() -> &'static str {
    if cfg!(windows) {
        "hytale-downloader-windows-amd64.exe"
    } else {
        "hytale-downloader-linux-amd64"
    }
}

fn find_file_ignore_case(root: &Path, name: &str) -> Result<Option<PathBuf>> {
    let mut pending = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = pending.pop_front() {
        let entries =
            fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
            let path = entry.path();
            if path.is_dir() {
                pending.push_back(path);
            } else if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

fn list_relative_files(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut pending = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = pending.pop_front() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(relative) = path.strip_prefix(root) {
                found.push(relative.display().to_string());
            }
            if path.is_dir() {
                pending.push_back(path);
            }
        }
    }
    found.sort();
    found
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to mark executable: {}", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub request: InstallRequest,
    pub jvm_args: Vec<String>,
    /// Scratch directory for the downloader; emptied before and removed after.
    pub work_dir: PathBuf,
    pub retry: RetryPolicy,
}

/// Fetches a fresh bundle into the installation and records it.
///
/// The setup state is only written after every other step succeeded. The
/// work directory is removed afterwards whether or not the install worked.
pub fn install(
    layout: &InstallLayout,
    options: &InstallOptions,
    source: &dyn BundleSource,
    lookup: &dyn VersionLookup,
    reporter: &dyn Reporter,
) -> Result<InstallationRecord> {
    let mut sleep = |delay: Duration| thread::sleep(delay);
    layout.ensure_server_dir()?;
    recreate_dir(&options.work_dir, options.retry, &mut sleep)?;

    let outcome = stage_and_apply(layout, options, source, lookup, reporter);

    reporter.report(Report::InstallStep {
        step: "cleaning up temporary files".to_string(),
    });
    if !remove_dir_all_with_retry(&options.work_dir, options.retry, &mut sleep) {
        reporter.report(Report::CleanupIncomplete {
            path: options.work_dir.clone(),
            attempts: options.retry.attempts,
        });
    }

    outcome
}

fn stage_and_apply(
    layout: &InstallLayout,
    options: &InstallOptions,
    source: &dyn BundleSource,
    lookup: &dyn VersionLookup,
    reporter: &dyn Reporter,
) -> Result<InstallationRecord> {
    let channel = &options.request.channel;
    let bundle = source.stage_bundle(channel, &options.work_dir, reporter)?;

    reporter.report(Report::InstallStep {
        step: format!("extracting server files to {}", layout.server_dir().display()),
    });
    extract_zip(&bundle, layout.server_dir())?;

    ensure_scripts_patched(layout, reporter)?;
    write_args_file(layout, &options.jvm_args)?;

    let detected = lookup.detect_installed_version(layout);
    let resolved = match &options.request.version {
        VersionRequest::Latest => lookup
            .resolve_latest_remote_version(channel)
            .unwrap_or_else(|| detected.clone()),
        // The downloader always fetches the channel head, so record what
        // actually landed on disk.
        VersionRequest::Exact(version) => {
            if !version.eq_ignore_ascii_case(&detected) {
                reporter.report(Report::PinnedVersionMismatch {
                    requested: version.clone(),
                    installed: detected.clone(),
                });
            }
            detected.clone()
        }
    };

    save_installation_record(layout, channel, &resolved, &detected)
}
