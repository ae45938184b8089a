mod fs_utils;
mod install;
mod scripts;
mod staleness;
mod state;

pub use fs_utils::{
    recreate_dir, remove_dir_all_with_retry, remove_dir_all_with_retry_using, RetryPolicy,
};
pub use install::{
    downloader_executable_name, install, BundleSource, InstallOptions, OfficialDownloaderBundle,
    DEFAULT_DOWNLOADER_URL,
};
pub use scripts::{ensure_scripts_patched, write_args_file, PatchSummary};
pub use staleness::{evaluate_staleness, must_reinstall, InstallRequest, StaleReason, Staleness};
pub use state::{
    compute_fingerprint, fingerprint_matches, fingerprint_matches_with, load_installation_record,
    read_installation_record, save_installation_record,
};
