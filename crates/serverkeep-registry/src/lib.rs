mod download;
mod extract;
mod metadata;

use std::path::Path;

use anyhow::Result;
use serverkeep_core::Channel;

pub use download::{HttpDownloader, DOWNLOAD_CONNECT_TIMEOUT};
pub use extract::extract_zip;
pub use metadata::{
    extract_last_version_in_versions_block, extract_tag_value, latest_version_from_metadata,
    HttpMetadataSource, DEFAULT_METADATA_URL_TEMPLATE, METADATA_TIMEOUT,
};

/// Source of the per-channel version metadata document.
pub trait RemoteVersionSource {
    fn metadata_url(&self, channel: &Channel) -> String;

    fn fetch_metadata(&self, channel: &Channel) -> Result<String>;
}

/// Fetches remote files and unpacks archives.
pub trait Downloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;

    fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<()>;
}
