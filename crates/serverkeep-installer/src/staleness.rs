use std::fmt;

use serverkeep_core::{
    ArtifactKind, Channel, InstallLayout, InstallationRecord, Report, Reporter, VersionLookup,
    VersionRequest,
};

use crate::state::fingerprint_matches;

/// What the caller wants installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    pub channel: Channel,
    pub version: VersionRequest,
    pub force_update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    ForceUpdate,
    NotInstalled,
    MissingRecord,
    ChannelChanged { recorded: String, requested: String },
    DetectedVersionChanged { recorded: String, detected: String },
    UpdateAvailable { recorded: String, remote: String },
    VersionChanged { recorded: String, requested: String },
    ArtifactMissing(ArtifactKind),
    ArtifactModified(ArtifactKind),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceUpdate => f.write_str("update forced"),
            Self::NotInstalled => f.write_str("server is not installed"),
            Self::MissingRecord => f.write_str("no usable setup state"),
            Self::ChannelChanged {
                recorded,
                requested,
            } => write!(f, "channel changed from {recorded} to {requested}"),
            Self::DetectedVersionChanged { recorded, detected } => {
                write!(f, "installed server version changed from {recorded} to {detected}")
            }
            Self::UpdateAvailable { recorded, remote } => {
                write!(f, "update available: {recorded} -> {remote}")
            }
            Self::VersionChanged {
                recorded,
                requested,
            } => write!(f, "requested version {requested} differs from installed {recorded}"),
            Self::ArtifactMissing(kind) => write!(f, "{} is missing", kind.as_str()),
            Self::ArtifactModified(kind) => {
                write!(f, "{} does not match the recorded fingerprint", kind.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Current,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Decides whether the installation has to be refreshed.
///
/// Rules are checked in order and the first one that fires wins, so the
/// remote lookup only happens for an installation that is otherwise intact
/// on channel and installed version.
pub fn evaluate_staleness(
    request: &InstallRequest,
    record: Option<&InstallationRecord>,
    layout: &InstallLayout,
    lookup: &dyn VersionLookup,
    reporter: &dyn Reporter,
) -> Staleness {
    if request.force_update {
        return Staleness::Stale(StaleReason::ForceUpdate);
    }
    if !layout.is_installed() {
        return Staleness::Stale(StaleReason::NotInstalled);
    }
    let Some(record) = record else {
        return Staleness::Stale(StaleReason::MissingRecord);
    };

    if !request.channel.matches(&record.channel) {
        return Staleness::Stale(StaleReason::ChannelChanged {
            recorded: record.channel.clone(),
            requested: request.channel.to_string(),
        });
    }

    let detected = lookup.detect_installed_version(layout);
    if !detected.eq_ignore_ascii_case(record.detected_version()) {
        return Staleness::Stale(StaleReason::DetectedVersionChanged {
            recorded: record.detected_version().to_string(),
            detected,
        });
    }

    match &request.version {
        VersionRequest::Latest => {
            if let Some(remote) = lookup.resolve_latest_remote_version(&request.channel) {
                if !remote.eq_ignore_ascii_case(record.resolved_version()) {
                    reporter.report(Report::UpdateAvailable {
                        remote: remote.clone(),
                        current: record.resolved_version().to_string(),
                    });
                    return Staleness::Stale(StaleReason::UpdateAvailable {
                        recorded: record.resolved_version().to_string(),
                        remote,
                    });
                }
            }
        }
        VersionRequest::Exact(version) => {
            if !version.eq_ignore_ascii_case(record.resolved_version()) {
                return Staleness::Stale(StaleReason::VersionChanged {
                    recorded: record.resolved_version().to_string(),
                    requested: version.clone(),
                });
            }
        }
    }

    for kind in ArtifactKind::ALL {
        if !layout.artifact_path(kind).exists() {
            return Staleness::Stale(StaleReason::ArtifactMissing(kind));
        }
    }
    for kind in ArtifactKind::ALL {
        if !fingerprint_matches(&layout.artifact_path(kind), record.fingerprint(kind)) {
            return Staleness::Stale(StaleReason::ArtifactModified(kind));
        }
    }

    Staleness::Current
}

pub fn must_reinstall(
    request: &InstallRequest,
    record: Option<&InstallationRecord>,
    layout: &InstallLayout,
    lookup: &dyn VersionLookup,
    reporter: &dyn Reporter,
) -> bool {
    evaluate_staleness(request, record, layout, lookup, reporter).is_stale()
}
