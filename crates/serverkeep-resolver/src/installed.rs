use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serverkeep_core::{InstallLayout, UNKNOWN_VERSION};

const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";
const VERSION_KEYS: [&str; 2] = ["Implementation-Version", "Bundle-Version"];

/// Version embedded in the installed server jar, or `"unknown"`.
pub fn detect_installed_version(layout: &InstallLayout) -> String {
    let jar = layout.server_jar_path();
    if !jar.exists() {
        return UNKNOWN_VERSION.to_string();
    }

    match read_jar_manifest(&jar) {
        Ok(Some(manifest)) => {
            manifest_version(&manifest).unwrap_or_else(|| UNKNOWN_VERSION.to_string())
        }
        Ok(None) | Err(_) => UNKNOWN_VERSION.to_string(),
    }
}

pub fn read_jar_manifest(jar: &Path) -> Result<Option<String>> {
    let file = fs::File::open(jar).with_context(|| format!("failed to open {}", jar.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("failed to read jar {}", jar.display()))?;
    let mut entry = match archive.by_name(MANIFEST_ENTRY) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read manifest of {}", jar.display()))
        }
    };
    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .with_context(|| format!("failed to read manifest of {}", jar.display()))?;
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

/// `Implementation-Version`, else `Bundle-Version`, from the main section.
pub fn manifest_version(manifest: &str) -> Option<String> {
    let attributes = main_attributes(manifest);
    VERSION_KEYS.iter().find_map(|key| {
        attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn main_attributes(manifest: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for line in manifest.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = attributes.last_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        attributes.push((name.trim().to_string(), value.trim_start().to_string()));
    }
    attributes
}
