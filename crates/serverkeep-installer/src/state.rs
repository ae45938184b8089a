use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use serverkeep_core::{
    ArtifactFingerprint, ArtifactKind, Channel, InstallLayout, InstallationRecord, Report, Reporter,
};
use serverkeep_security::{digests_match, sha256_file_hex};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupStateFile<'a> {
    channel: &'a str,
    version: &'a str,
    resolved_version: &'a str,
    detected_version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_jar_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_jar_last_modified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_jar_sha256: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets_zip_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets_zip_last_modified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets_zip_sha256: Option<&'a str>,
}

/// Reads the setup state, treating anything unusable as "no record".
///
/// A missing file is silent; unreadable or malformed files are reported.
pub fn load_installation_record(
    layout: &InstallLayout,
    reporter: &dyn Reporter,
) -> Option<InstallationRecord> {
    match read_installation_record(layout) {
        Ok(record) => record,
        Err(err) => {
            reporter.report(Report::StateFileUnreadable {
                path: layout.state_path(),
                reason: format!("{err:#}"),
            });
            None
        }
    }
}

/// Strict variant of [`load_installation_record`] for diagnostics.
pub fn read_installation_record(layout: &InstallLayout) -> Result<Option<InstallationRecord>> {
    let path = layout.state_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read setup state: {}", path.display()));
        }
    };
    let record = parse_setup_state(&raw)
        .with_context(|| format!("failed to parse setup state: {}", path.display()))?;
    Ok(Some(record))
}

pub(crate) fn parse_setup_state(raw: &str) -> Result<InstallationRecord> {
    let value: Value = serde_json::from_str(raw).context("setup state is not valid JSON")?;
    let Value::Object(map) = value else {
        return Err(anyhow!("setup state must be a JSON object"));
    };

    let channel = string_field(&map, "channel").context("missing channel")?;
    let declared_version = string_field(&map, "version").context("missing version")?;

    Ok(InstallationRecord {
        channel,
        declared_version,
        resolved_version: string_field(&map, "resolvedVersion"),
        detected_version: string_field(&map, "detectedVersion"),
        server_artifact: ArtifactFingerprint {
            size_bytes: integer_field(&map, "serverJarSize"),
            last_modified_epoch_ms: integer_field(&map, "serverJarLastModified"),
            sha256_hex: string_field(&map, "serverJarSha256"),
        },
        assets_artifact: ArtifactFingerprint {
            size_bytes: integer_field(&map, "assetsZipSize"),
            last_modified_epoch_ms: integer_field(&map, "assetsZipLastModified"),
            sha256_hex: string_field(&map, "assetsZipSha256"),
        },
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn integer_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float as i64)),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Fingerprints both artifacts as they are on disk now and replaces the
/// setup state. Missing artifacts get no fingerprint keys at all.
pub fn save_installation_record(
    layout: &InstallLayout,
    channel: &Channel,
    resolved_version: &str,
    detected_version: &str,
) -> Result<InstallationRecord> {
    let server_artifact = compute_fingerprint(&layout.artifact_path(ArtifactKind::ServerJar))?
        .unwrap_or_default();
    let assets_artifact = compute_fingerprint(&layout.artifact_path(ArtifactKind::AssetsZip))?
        .unwrap_or_default();

    let state = SetupStateFile {
        channel: channel.as_str(),
        version: resolved_version,
        resolved_version,
        detected_version,
        server_jar_size: server_artifact.size_bytes,
        server_jar_last_modified: server_artifact.last_modified_epoch_ms,
        server_jar_sha256: server_artifact.sha256_hex.as_deref(),
        assets_zip_size: assets_artifact.size_bytes,
        assets_zip_last_modified: assets_artifact.last_modified_epoch_ms,
        assets_zip_sha256: assets_artifact.sha256_hex.as_deref(),
    };
    let content =
        serde_json::to_string_pretty(&state).context("failed to serialize setup state")?;

    let path = layout.state_path();
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content.as_bytes())
        .with_context(|| format!("failed to write setup state: {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("failed to replace setup state: {}", path.display()))?;

    Ok(InstallationRecord {
        channel: channel.as_str().to_string(),
        declared_version: resolved_version.to_string(),
        resolved_version: Some(resolved_version.to_string()),
        detected_version: Some(detected_version.to_string()),
        server_artifact,
        assets_artifact,
    })
}

/// Size, mtime and hash of `path`, or `None` when the file does not exist.
pub fn compute_fingerprint(path: &Path) -> Result<Option<ArtifactFingerprint>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to stat {}", path.display()));
        }
    };
    Ok(Some(ArtifactFingerprint {
        size_bytes: Some(metadata.len() as i64),
        last_modified_epoch_ms: modified_epoch_ms(&metadata),
        sha256_hex: Some(sha256_file_hex(path)?),
    }))
}

/// Whether `path` still matches the recorded fingerprint.
pub fn fingerprint_matches(path: &Path, expected: &ArtifactFingerprint) -> bool {
    fingerprint_matches_with(path, expected, sha256_file_hex)
}

/// Same as [`fingerprint_matches`] with the hash function supplied.
///
/// `hash` is only called when size or mtime differ from the record.
pub fn fingerprint_matches_with<H>(path: &Path, expected: &ArtifactFingerprint, mut hash: H) -> bool
where
    H: FnMut(&Path) -> Result<String>,
{
    if !expected.is_complete() {
        return false;
    }
    let (Some(size), Some(modified), Some(sha256)) = (
        expected.size_bytes,
        expected.last_modified_epoch_ms,
        expected.sha256_hex.as_deref(),
    ) else {
        return false;
    };

    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if metadata.len() as i64 == size && modified_epoch_ms(&metadata) == Some(modified) {
        return true;
    }

    match hash(path) {
        Ok(actual) => digests_match(&actual, sha256),
        Err(_) => false,
    }
}

fn modified_epoch_ms(metadata: &fs::Metadata) -> Option<i64> {
    let modified = metadata.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_millis()).ok()
}
