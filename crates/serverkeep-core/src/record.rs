/// The two tracked artifacts of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ServerJar,
    AssetsZip,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::ServerJar, ArtifactKind::AssetsZip];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerJar => "server jar",
            Self::AssetsZip => "assets zip",
        }
    }
}

/// Size, modification time and content hash recorded for one artifact.
///
/// Every field is optional. A fingerprint with any field missing cannot be
/// verified and never counts as a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactFingerprint {
    pub size_bytes: Option<i64>,
    pub last_modified_epoch_ms: Option<i64>,
    pub sha256_hex: Option<String>,
}

impl ArtifactFingerprint {
    pub fn is_complete(&self) -> bool {
        self.size_bytes.is_some()
            && self.last_modified_epoch_ms.is_some()
            && self
                .sha256_hex
                .as_deref()
                .is_some_and(|hash| !hash.trim().is_empty())
    }
}

/// What the last successful install left in an installation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    pub channel: String,
    pub declared_version: String,
    pub resolved_version: Option<String>,
    pub detected_version: Option<String>,
    pub server_artifact: ArtifactFingerprint,
    pub assets_artifact: ArtifactFingerprint,
}

impl InstallationRecord {
    /// Falls back to the declared version for records written before the
    /// field existed.
    pub fn resolved_version(&self) -> &str {
        self.resolved_version
            .as_deref()
            .unwrap_or(&self.declared_version)
    }

    pub fn detected_version(&self) -> &str {
        self.detected_version
            .as_deref()
            .unwrap_or(&self.declared_version)
    }

    pub fn fingerprint(&self, kind: ArtifactKind) -> &ArtifactFingerprint {
        match kind {
            ArtifactKind::ServerJar => &self.server_artifact,
            ArtifactKind::AssetsZip => &self.assets_artifact,
        }
    }
}
