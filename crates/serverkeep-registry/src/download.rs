use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{extract_zip, Downloader};

pub const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Blocking HTTP downloader with zip extraction.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    connect_timeout: Duration,
    timeout: Duration,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            connect_timeout: DOWNLOAD_CONNECT_TIMEOUT,
            timeout: DOWNLOAD_TIMEOUT,
            show_progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn progress_bar(&self, total: Option<u64>, url: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan.bold} {msg} [{bar:24.cyan/blue}] {bytes}/{total_bytes} {elapsed_precise}",
        ) {
            progress_bar.set_style(style.progress_chars("=> "));
        }
        let file_name = url.rsplit('/').next().unwrap_or(url);
        progress_bar.set_message(file_name.to_string());
        progress_bar
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .user_agent(concat!("serverkeep/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build download http client")?;
        let response = client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {url}"))?
            .error_for_status()
            .with_context(|| format!("download request failed: {url}"))?;

        let part_path = dest.with_file_name(format!(
            "{}.part",
            dest.file_name()
                .and_then(|v| v.to_str())
                .unwrap_or("download")
        ));
        let progress_bar = self.progress_bar(response.content_length(), url);
        let result = (|| -> Result<()> {
            let mut out = fs::File::create(&part_path)
                .with_context(|| format!("failed to create {}", part_path.display()))?;
            io::copy(&mut progress_bar.wrap_read(response), &mut out)
                .with_context(|| format!("failed writing download from {url}"))?;
            out.sync_all().ok();
            Ok(())
        })();
        progress_bar.finish_and_clear();

        if let Err(err) = result {
            let _ = fs::remove_file(&part_path);
            return Err(err);
        }

        if dest.exists() {
            fs::remove_file(dest)
                .with_context(|| format!("failed to replace {}", dest.display()))?;
        }
        fs::rename(&part_path, dest)
            .with_context(|| format!("failed to move download into {}", dest.display()))?;
        Ok(())
    }

    fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<()> {
        extract_zip(archive, dest)
    }
}
