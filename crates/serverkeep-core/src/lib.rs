mod channel;
mod layout;
mod record;
mod report;
mod terminal;

pub use channel::{Channel, VersionRequest, UNKNOWN_VERSION};
pub use layout::{InstallLayout, ARGS_FILE_NAME, STATE_FILE_NAME};
pub use record::{ArtifactFingerprint, ArtifactKind, InstallationRecord};
pub use report::{RecordingReporter, Report, Reporter, TracingReporter};
pub use terminal::{default_terminal_kinds, TerminalKind, COMMAND_PLACEHOLDER};

/// Version probes the staleness check depends on.
///
/// Implemented over the jar manifest and the remote metadata endpoint in
/// `serverkeep-resolver`; tests substitute fixed answers.
pub trait VersionLookup {
    fn detect_installed_version(&self, layout: &InstallLayout) -> String;

    fn resolve_latest_remote_version(&self, channel: &Channel) -> Option<String>;
}

#[cfg(test)]
mod tests;
