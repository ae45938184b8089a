use std::path::PathBuf;
use std::sync::Mutex;

/// Structured events emitted by the installer and supervisor.
///
/// Soft failures surface here instead of as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    CheckingForUpdates { url: String },
    RemoteMetadataUnavailable { url: String, reason: String },
    UpdateAvailable { remote: String, current: String },
    PinnedVersionMismatch { requested: String, installed: String },
    ReinstallRequired { reason: String },
    InstallationCurrent,
    StateFileUnreadable { path: PathBuf, reason: String },
    ScriptAnchorMissing { script: PathBuf, anchor: String },
    ScriptUnpatchable { script: PathBuf, reason: String },
    ScriptPatched { script: PathBuf },
    InstallStep { step: String },
    CleanupIncomplete { path: PathBuf, attempts: u32 },
    RuntimeHomeResolved { path: Option<PathBuf> },
    ServerRestartRequested { launches: u32 },
    TerminalLaunchFailed { terminal: String, reason: String },
    TerminalLaunched { terminal: String },
    TerminalFallback,
}

impl Report {
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::RemoteMetadataUnavailable { .. }
                | Self::PinnedVersionMismatch { .. }
                | Self::StateFileUnreadable { .. }
                | Self::ScriptAnchorMissing { .. }
                | Self::ScriptUnpatchable { .. }
                | Self::CleanupIncomplete { .. }
                | Self::TerminalLaunchFailed { .. }
                | Self::TerminalFallback
        )
    }
}

pub trait Reporter {
    fn report(&self, event: Report);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Report) {
        match event {
            Report::CheckingForUpdates { url } => {
                tracing::info!(%url, "checking for updates");
            }
            Report::RemoteMetadataUnavailable { url, reason } => {
                tracing::warn!(%url, %reason, "failed to fetch remote version metadata");
            }
            Report::UpdateAvailable { remote, current } => {
                tracing::info!(%remote, %current, "new server version available");
            }
            Report::PinnedVersionMismatch {
                requested,
                installed,
            } => {
                tracing::warn!(
                    %requested,
                    %installed,
                    "downloaded server does not report the pinned version"
                );
            }
            Report::ReinstallRequired { reason } => {
                tracing::info!(%reason, "installation must be refreshed");
            }
            Report::InstallationCurrent => {
                tracing::info!("installation is up to date");
            }
            Report::StateFileUnreadable { path, reason } => {
                tracing::warn!(path = %path.display(), %reason, "ignoring unreadable setup state");
            }
            Report::ScriptAnchorMissing { script, anchor } => {
                tracing::warn!(
                    script = %script.display(),
                    %anchor,
                    "could not patch launcher script: anchor not found"
                );
            }
            Report::ScriptUnpatchable { script, reason } => {
                tracing::warn!(script = %script.display(), %reason, "skipping launcher script");
            }
            Report::ScriptPatched { script } => {
                tracing::debug!(script = %script.display(), "patched launcher script");
            }
            Report::InstallStep { step } => {
                tracing::info!("{step}");
            }
            Report::CleanupIncomplete { path, attempts } => {
                tracing::warn!(path = %path.display(), attempts, "giving up removing directory");
            }
            Report::RuntimeHomeResolved { path: Some(path) } => {
                tracing::debug!(path = %path.display(), "using java runtime");
            }
            Report::RuntimeHomeResolved { path: None } => {
                tracing::debug!("no java runtime resolved, relying on PATH");
            }
            Report::ServerRestartRequested { launches } => {
                tracing::info!(launches, "server requested a restart");
            }
            Report::TerminalLaunchFailed { terminal, reason } => {
                tracing::debug!(%terminal, %reason, "terminal launch failed");
            }
            Report::TerminalLaunched { terminal } => {
                tracing::info!(%terminal, "launched server in terminal");
            }
            Report::TerminalFallback => {
                tracing::warn!("no terminal emulator could be started, running in this console");
            }
        }
    }
}

/// Captures events so tests can assert on them.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Report> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn warnings(&self) -> Vec<Report> {
        self.events()
            .into_iter()
            .filter(Report::is_warning)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: Report) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
