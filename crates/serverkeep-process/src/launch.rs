use std::env;
use std::ffi::OsString;
use std::path::{self, Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use serverkeep_core::InstallLayout;

use crate::error::SupervisorError;

/// Command that runs the launcher script attached to this console.
///
/// With a runtime home, its `bin` directory goes first on `PATH` and
/// `JAVA_HOME` points at it.
pub fn attached_command(
    layout: &InstallLayout,
    script: &Path,
    extra_args: &[String],
    runtime_home: Option<&Path>,
) -> Command {
    let mut command = if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/c").arg("call").arg(script);
        command
    } else {
        let mut command = Command::new("bash");
        command.arg(script);
        command
    };
    command
        .args(extra_args)
        .current_dir(layout.server_dir())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    if let Some(home) = runtime_home {
        command.env("JAVA_HOME", home);
        if let Some(path) = path_with_runtime(&home.join("bin"), env::var_os("PATH")) {
            command.env("PATH", path);
        }
    }
    command
}

/// `PATH` with `bin` prepended, or `None` if it cannot be represented.
pub fn path_with_runtime(bin: &Path, existing: Option<OsString>) -> Option<OsString> {
    let mut entries = vec![bin.to_path_buf()];
    if let Some(existing) = existing {
        entries.extend(env::split_paths(&existing));
    }
    env::join_paths(entries).ok()
}

/// Runs the launcher script and blocks until the server exits.
///
/// Only a failure to start is an error; any exit code is returned as is.
pub fn launch_attached(
    layout: &InstallLayout,
    script: &Path,
    extra_args: &[String],
    runtime_home: Option<&Path>,
) -> Result<i32, SupervisorError> {
    let script = absolute_script(script);
    let mut command = attached_command(layout, &script, extra_args, runtime_home);
    let program = command.get_program().to_string_lossy().into_owned();
    let status = command
        .status()
        .map_err(|source| SupervisorError::Spawn { program, source })?;
    Ok(exit_code(status))
}

fn absolute_script(script: &Path) -> PathBuf {
    path::absolute(script).unwrap_or_else(|_| script.to_path_buf())
}

/// Exit code of a finished process; death by signal maps to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
