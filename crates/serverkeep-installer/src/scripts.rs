use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serverkeep_core::{InstallLayout, Report, Reporter, ARGS_FILE_NAME};

const BAT_BLOCK_ANCHOR: &str = "rem Default server arguments";
const BAT_BLOCK: &str = "rem Extra JVM args injected by serverkeep\r\n\
set USER_JVM_ARGS=\r\n\
if exist \"%SCRIPT_DIR%\\.hytale-jvm.args\" (\r\n    \
for /f \"usebackq delims=\" %%A in (\"%SCRIPT_DIR%\\.hytale-jvm.args\") do set USER_JVM_ARGS=%%A\r\n\
)\r\n\
\r\n";
const BAT_LAUNCH_LINE: &str = "java %JVM_ARGS% -jar HytaleServer.jar";
const BAT_PATCHED_LAUNCH_LINE: &str = "java %JVM_ARGS% %USER_JVM_ARGS% -jar HytaleServer.jar";

const SH_BLOCK_ANCHOR: &str = "cd \"$SCRIPT_DIR\"";
const SH_BLOCK: &str = "\n\nUSER_JVM_ARGS=\"\"\n\
if [ -f \"$SCRIPT_DIR/.hytale-jvm.args\" ]; then\n  \
read -r USER_JVM_ARGS < \"$SCRIPT_DIR/.hytale-jvm.args\"\n\
fi";
const SH_LAUNCH_LINE: &str = "java $JVM_ARGS -jar HytaleServer.jar";
const SH_PATCHED_LAUNCH_LINE: &str = "java $JVM_ARGS $USER_JVM_ARGS -jar HytaleServer.jar";

enum BlockPlacement {
    BeforeAnchor,
    AfterAnchor,
}

/// Text edits for one launcher script flavour.
struct ScriptDialect {
    block_anchor: &'static str,
    block: &'static str,
    placement: BlockPlacement,
    launch_line: &'static str,
    patched_launch_line: &'static str,
    /// Checked before rewriting the launch line.
    user_args_marker: &'static str,
    case_insensitive_markers: bool,
}

const BATCH: ScriptDialect = ScriptDialect {
    block_anchor: BAT_BLOCK_ANCHOR,
    block: BAT_BLOCK,
    placement: BlockPlacement::BeforeAnchor,
    launch_line: BAT_LAUNCH_LINE,
    patched_launch_line: BAT_PATCHED_LAUNCH_LINE,
    user_args_marker: "%USER_JVM_ARGS%",
    case_insensitive_markers: true,
};

const SHELL: ScriptDialect = ScriptDialect {
    block_anchor: SH_BLOCK_ANCHOR,
    block: SH_BLOCK,
    placement: BlockPlacement::AfterAnchor,
    launch_line: SH_LAUNCH_LINE,
    patched_launch_line: SH_PATCHED_LAUNCH_LINE,
    user_args_marker: SH_PATCHED_LAUNCH_LINE,
    case_insensitive_markers: false,
};

impl ScriptDialect {
    fn contains_marker(&self, text: &str, marker: &str) -> bool {
        if self.case_insensitive_markers {
            text.to_ascii_lowercase()
                .contains(&marker.to_ascii_lowercase())
        } else {
            text.contains(marker)
        }
    }

    fn patch(&self, script: &Path, text: &str, reporter: &dyn Reporter) -> String {
        let mut updated = text.to_string();

        if !self.contains_marker(&updated, ARGS_FILE_NAME) {
            if updated.contains(self.block_anchor) {
                let replacement = match self.placement {
                    BlockPlacement::BeforeAnchor => format!("{}{}", self.block, self.block_anchor),
                    BlockPlacement::AfterAnchor => format!("{}{}", self.block_anchor, self.block),
                };
                updated = updated.replacen(self.block_anchor, &replacement, 1);
            } else {
                reporter.report(Report::ScriptAnchorMissing {
                    script: script.to_path_buf(),
                    anchor: self.block_anchor.to_string(),
                });
            }
        }

        if !self.contains_marker(&updated, self.user_args_marker) {
            if updated.contains(self.launch_line) {
                updated = updated.replacen(self.launch_line, self.patched_launch_line, 1);
            } else {
                reporter.report(Report::ScriptAnchorMissing {
                    script: script.to_path_buf(),
                    anchor: self.launch_line.to_string(),
                });
            }
        }

        updated
    }
}

/// Scripts rewritten by [`ensure_scripts_patched`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub written: Vec<PathBuf>,
}

/// Makes the launcher scripts pick up the args side file.
///
/// Safe to run repeatedly: a script that is already patched is left
/// byte-identical and is not rewritten. Missing scripts are skipped, and a
/// script that cannot be read or written is reported and skipped without
/// affecting the other one.
pub fn ensure_scripts_patched(
    layout: &InstallLayout,
    reporter: &dyn Reporter,
) -> Result<PatchSummary> {
    let mut summary = PatchSummary::default();

    for (path, dialect) in [
        (layout.start_bat_path(), &BATCH),
        (layout.start_sh_path(), &SHELL),
    ] {
        match patch_script(&path, dialect, reporter) {
            Ok(true) => summary.written.push(path),
            Ok(false) => {}
            Err(err) => reporter.report(Report::ScriptUnpatchable {
                script: path,
                reason: format!("{err:#}"),
            }),
        }
    }

    let sh = layout.start_sh_path();
    if sh.exists() {
        make_executable(&sh)?;
    }

    Ok(summary)
}

fn patch_script(path: &Path, dialect: &ScriptDialect, reporter: &dyn Reporter) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read launcher script: {}", path.display()))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            reporter.report(Report::ScriptUnpatchable {
                script: path.to_path_buf(),
                reason: format!("not valid UTF-8: {}", err.utf8_error()),
            });
            return Ok(false);
        }
    };
    let updated = dialect.patch(path, &text, reporter);
    if updated == text {
        return Ok(false);
    }
    fs::write(path, updated.as_bytes())
        .with_context(|| format!("failed to write launcher script: {}", path.display()))?;
    reporter.report(Report::ScriptPatched {
        script: path.to_path_buf(),
    });
    Ok(true)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to stat launcher script: {}", path.display()))?;
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o111 == 0o111 {
        return Ok(());
    }
    permissions.set_mode(mode | 0o111);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("failed to mark executable: {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Writes the JVM args side file read by the patched scripts.
pub fn write_args_file(layout: &InstallLayout, args: &[String]) -> Result<PathBuf> {
    let path = layout.args_path();
    fs::write(&path, args.join(" "))
        .with_context(|| format!("failed to write JVM args file: {}", path.display()))?;
    Ok(path)
}
