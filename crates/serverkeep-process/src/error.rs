use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error(
        "server exited with code {code}; run it in the foreground (for example with --no-daemon) to see its console output"
    )]
    ServerFailed { code: i32 },

    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}
