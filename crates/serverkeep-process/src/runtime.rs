use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RUNTIME_MAJOR: u32 = 25;

/// Where to look for a Java runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeProbe {
    /// Directories holding one runtime install per subdirectory.
    pub managed_roots: Vec<PathBuf>,
    /// The runtime the environment already points at (`JAVA_HOME`).
    pub current_home: Option<PathBuf>,
}

impl RuntimeProbe {
    pub fn from_env() -> Self {
        let mut managed_roots = Vec::new();
        if let Some(home) = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")) {
            let home = PathBuf::from(home);
            managed_roots.push(home.join(".gradle").join("jdks"));
            managed_roots.push(home.join(".jdks"));
        }
        if cfg!(unix) {
            managed_roots.push(PathBuf::from("/usr/lib/jvm"));
        }
        Self {
            managed_roots,
            current_home: env::var_os("JAVA_HOME")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Picks the runtime home the server is launched with, if any.
///
/// A managed install of `desired_major` wins. Otherwise the current home is
/// used when it has a `bin` directory, then its parent (a JRE nested in a
/// JDK). `None` leaves the launcher script to find `java` on `PATH`.
pub fn resolve_runtime_home(probe: &RuntimeProbe, desired_major: u32) -> Option<PathBuf> {
    if let Some(managed) = find_managed_runtime(&probe.managed_roots, desired_major) {
        return Some(managed);
    }

    let current = probe.current_home.as_deref()?;
    if has_bin(current) {
        return Some(current.to_path_buf());
    }
    current
        .parent()
        .filter(|parent| has_bin(parent))
        .map(Path::to_path_buf)
}

fn find_managed_runtime(roots: &[PathBuf], desired_major: u32) -> Option<PathBuf> {
    for root in roots {
        let Ok(entries) = fs::read_dir(root) else {
            continue;
        };
        let mut candidates = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .and_then(java_major_from_dir_name)
                    == Some(desired_major)
            })
            .filter(|path| has_bin(path))
            .collect::<Vec<_>>();
        candidates.sort();
        if let Some(found) = candidates.pop() {
            return Some(found);
        }
    }
    None
}

fn has_bin(home: &Path) -> bool {
    home.join("bin").is_dir()
}

/// Major version carried by a runtime directory name such as
/// `jdk-25.0.1+8`, `temurin-21` or `java-1.8.0-openjdk`.
pub fn java_major_from_dir_name(name: &str) -> Option<u32> {
    let start = name.find(|ch: char| ch.is_ascii_digit())?;
    let rest = &name[start..];
    let mut parts = rest.split(|ch: char| !ch.is_ascii_digit());
    let first = parts.next()?.parse::<u32>().ok()?;
    if first == 1 && rest.starts_with("1.") {
        // Legacy "1.8" form.
        return parts.next()?.parse().ok();
    }
    Some(first)
}
