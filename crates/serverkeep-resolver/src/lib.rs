mod installed;
mod remote;

pub use installed::{detect_installed_version, manifest_version, read_jar_manifest};
pub use remote::VersionResolver;
