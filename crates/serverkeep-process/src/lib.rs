mod error;
mod interactive;
mod launch;
mod runtime;
mod supervisor;

pub use error::SupervisorError;
pub use interactive::{
    cmd_arguments, is_cmd, launch_in_terminal, ProcessSpawner, SystemSpawner, TerminalLaunch,
};
pub use launch::{attached_command, exit_code, launch_attached, path_with_runtime};
pub use runtime::{java_major_from_dir_name, resolve_runtime_home, RuntimeProbe, DEFAULT_RUNTIME_MAJOR};
pub use supervisor::{run_server, supervise, RunOptions, SupervisorState, RESTART_EXIT_CODE};

#[cfg(test)]
mod tests;
