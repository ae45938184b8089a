use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serverkeep_core::Channel;

use crate::RemoteVersionSource;

pub const DEFAULT_METADATA_URL_TEMPLATE: &str =
    "https://maven.hytale.com/{channel}/com/hypixel/hytale/Server/maven-metadata.xml";
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads maven-style metadata over HTTP. No retries.
#[derive(Debug, Clone)]
pub struct HttpMetadataSource {
    url_template: String,
    timeout: Duration,
}

impl HttpMetadataSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            timeout: METADATA_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpMetadataSource {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_URL_TEMPLATE)
    }
}

impl RemoteVersionSource for HttpMetadataSource {
    fn metadata_url(&self, channel: &Channel) -> String {
        self.url_template
            .replace("{channel}", &channel.url_segment())
    }

    fn fetch_metadata(&self, channel: &Channel) -> Result<String> {
        let url = self.metadata_url(channel);
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .user_agent(concat!("serverkeep/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build metadata http client")?;
        let response = client
            .get(&url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("metadata request failed: {url}"))?;
        response
            .text()
            .with_context(|| format!("failed to read metadata body from {url}"))
    }
}

/// Picks the version a `latest` request resolves to.
///
/// The last `<version>` of the `<versions>` block wins by document order,
/// then `<release>`, then `<latest>`. No semantic-version ordering is applied.
pub fn latest_version_from_metadata(xml: &str) -> Option<String> {
    extract_last_version_in_versions_block(xml)
        .or_else(|| extract_tag_value(xml, "release"))
        .or_else(|| extract_tag_value(xml, "latest"))
}

/// Body of the first `<tag>` element, trimmed; `None` when it is blank.
///
/// Only the first occurrence is considered. Tag names match
/// case-insensitively.
pub fn extract_tag_value(xml: &str, tag: &str) -> Option<String> {
    let pattern = tag_pattern(tag)?;
    let body = pattern.captures(xml)?.get(1)?.as_str().trim();
    (!body.is_empty()).then(|| body.to_string())
}

pub fn extract_last_version_in_versions_block(xml: &str) -> Option<String> {
    let block_pattern = Regex::new(r"(?is)<versions>\s*(.*?)\s*</versions>").ok()?;
    let block = block_pattern.captures(xml)?.get(1)?.as_str();
    let version_pattern = tag_pattern("version")?;
    version_pattern
        .captures_iter(block)
        .filter_map(|captures| captures.get(1))
        .map(|body| body.as_str().trim())
        .filter(|body| !body.is_empty())
        .last()
        .map(str::to_string)
}

fn tag_pattern(tag: &str) -> Option<Regex> {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?i)<{tag}>\s*([^<]+?)\s*</{tag}>")).ok()
}
