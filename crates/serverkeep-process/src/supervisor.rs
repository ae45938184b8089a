use std::path::PathBuf;

use anyhow::{bail, Result};
use serverkeep_core::{InstallLayout, Report, Reporter};

use crate::error::SupervisorError;
use crate::launch::launch_attached;
use crate::runtime::{resolve_runtime_home, RuntimeProbe, DEFAULT_RUNTIME_MAJOR};

/// Exit code a server uses to ask for an immediate relaunch.
pub const RESTART_EXIT_CODE: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Restarting,
    Succeeded,
    Failed(i32),
}

impl SupervisorState {
    pub fn after_exit(code: i32) -> Self {
        match code {
            0 => Self::Succeeded,
            RESTART_EXIT_CODE => Self::Restarting,
            other => Self::Failed(other),
        }
    }
}

/// Relaunches for as long as the server exits with [`RESTART_EXIT_CODE`].
///
/// Returns the number of launches once the server stops cleanly.
pub fn supervise<F>(mut launch: F, reporter: &dyn Reporter) -> Result<u32, SupervisorError>
where
    F: FnMut() -> Result<i32, SupervisorError>,
{
    let mut launches = 0;
    let mut state = SupervisorState::Running;
    loop {
        if state == SupervisorState::Restarting {
            reporter.report(Report::ServerRestartRequested { launches });
        }
        launches += 1;
        state = SupervisorState::after_exit(launch()?);
        match state {
            SupervisorState::Succeeded => return Ok(launches),
            SupervisorState::Failed(code) => return Err(SupervisorError::ServerFailed { code }),
            SupervisorState::Running | SupervisorState::Restarting => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub extra_args: Vec<String>,
    pub runtime_major: u32,
    pub probe: RuntimeProbe,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            extra_args: Vec::new(),
            runtime_major: DEFAULT_RUNTIME_MAJOR,
            probe: RuntimeProbe::default(),
        }
    }
}

/// Checks the installation, then runs the server until it stops for good.
pub fn run_server(
    layout: &InstallLayout,
    options: &RunOptions,
    reporter: &dyn Reporter,
) -> Result<u32> {
    let script = verify_runnable(layout)?;

    let runtime_home = resolve_runtime_home(&options.probe, options.runtime_major);
    reporter.report(Report::RuntimeHomeResolved {
        path: runtime_home.clone(),
    });

    let launches = supervise(
        || launch_attached(layout, &script, &options.extra_args, runtime_home.as_deref()),
        reporter,
    )?;
    Ok(launches)
}

fn verify_runnable(layout: &InstallLayout) -> Result<PathBuf> {
    let assets = layout.assets_zip_path();
    if !assets.exists() {
        bail!("missing Assets.zip at {}", assets.display());
    }
    let jar = layout.server_jar_path();
    if !jar.exists() {
        bail!("missing HytaleServer.jar at {}", jar.display());
    }
    let script = layout.platform_script_path();
    if !script.exists() {
        bail!("missing launcher script at {}", script.display());
    }
    Ok(script)
}
