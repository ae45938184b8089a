use serverkeep_core::{Channel, InstallLayout, Report, Reporter, VersionLookup};
use serverkeep_registry::{latest_version_from_metadata, RemoteVersionSource};

use crate::detect_installed_version;

/// Answers version questions from the installed jar and the remote metadata.
pub struct VersionResolver<'a, S> {
    source: S,
    reporter: &'a dyn Reporter,
}

impl<'a, S: RemoteVersionSource> VersionResolver<'a, S> {
    pub fn new(source: S, reporter: &'a dyn Reporter) -> Self {
        Self { source, reporter }
    }

    /// Network and parse failures are reported and yield `None`.
    pub fn resolve_latest_remote_version(&self, channel: &Channel) -> Option<String> {
        let url = self.source.metadata_url(channel);
        self.reporter
            .report(Report::CheckingForUpdates { url: url.clone() });
        match self.source.fetch_metadata(channel) {
            Ok(xml) => latest_version_from_metadata(&xml),
            Err(err) => {
                self.reporter.report(Report::RemoteMetadataUnavailable {
                    url,
                    reason: format!("{err:#}"),
                });
                None
            }
        }
    }
}

impl<S: RemoteVersionSource> VersionLookup for VersionResolver<'_, S> {
    fn detect_installed_version(&self, layout: &InstallLayout) -> String {
        detect_installed_version(layout)
    }

    fn resolve_latest_remote_version(&self, channel: &Channel) -> Option<String> {
        VersionResolver::resolve_latest_remote_version(self, channel)
    }
}
