use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

/// Bounded retry for removals that can race with handles still being
/// released (antivirus scanners, a child process that just exited).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(250),
        }
    }
}

/// Returns whether `dir` is gone afterwards. Never fails.
pub fn remove_dir_all_with_retry(
    dir: &Path,
    policy: RetryPolicy,
    sleep: &mut dyn FnMut(Duration),
) -> bool {
    remove_dir_all_with_retry_using(dir, policy, &mut |path: &Path| fs::remove_dir_all(path), sleep)
}

pub fn remove_dir_all_with_retry_using(
    dir: &Path,
    policy: RetryPolicy,
    remove: &mut dyn FnMut(&Path) -> io::Result<()>,
    sleep: &mut dyn FnMut(Duration),
) -> bool {
    for attempt in 1..=policy.attempts.max(1) {
        if !dir.exists() {
            return true;
        }
        let _ = remove(dir);
        if !dir.exists() {
            return true;
        }
        if attempt < policy.attempts {
            sleep(policy.delay);
        }
    }
    !dir.exists()
}

/// Empties `dir` by removing and recreating it.
pub fn recreate_dir(dir: &Path, policy: RetryPolicy, sleep: &mut dyn FnMut(Duration)) -> Result<()> {
    remove_dir_all_with_retry(dir, policy, sleep);
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}
