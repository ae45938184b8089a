mod completion;
mod config;
mod flows;
mod render;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use serverkeep_core::TracingReporter;
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, Settings};
use crate::flows::{
    print_setup_outcome, run_attached, run_interactive, run_patch_scripts, run_setup, run_status,
};

#[derive(Parser, Debug)]
#[command(name = "serverkeep")]
#[command(about = "Installs, updates and supervises a Hytale dedicated server", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default, Clone)]
struct GlobalArgs {
    /// Config file (defaults to ./serverkeep.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    server_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    channel: Option<String>,
    /// Exact server version, or "latest".
    #[arg(long = "server-version", global = true)]
    version: Option<String>,
    /// JVM argument written to the args file; repeatable.
    #[arg(long = "jvm-arg", global = true, allow_hyphen_values = true)]
    jvm_args: Vec<String>,
    /// Terminal name or a custom template containing {command}.
    #[arg(long, global = true)]
    terminal: Option<String>,
    /// Log at debug level (overridden by SERVERKEEP_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            server_dir: self.server_dir.clone(),
            channel: self.channel.clone(),
            version: self.version.clone(),
            jvm_args: self.jvm_args.clone(),
            terminal: self.terminal.clone(),
        }
    }

    /// Flags to hand to a re-invoked `serverkeep run`.
    fn forwarded(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };
        if let Some(config) = &self.config {
            push("--config", config.display().to_string());
        }
        if let Some(dir) = &self.server_dir {
            push("--server-dir", dir.display().to_string());
        }
        if let Some(channel) = &self.channel {
            push("--channel", channel.clone());
        }
        if let Some(version) = &self.version {
            push("--server-version", version.clone());
        }
        for arg in &self.jvm_args {
            push("--jvm-arg", arg.clone());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install or update the server when it is missing or stale.
    Setup {
        #[arg(long)]
        force_update: bool,
    },
    /// Set up, then run the server here, restarting it on request.
    Run {
        /// Extra server arguments, split on whitespace.
        #[arg(long, allow_hyphen_values = true)]
        server_args: Option<String>,
    },
    /// Set up, then run the server in a separate terminal window.
    RunInteractive {
        #[arg(long, allow_hyphen_values = true)]
        server_args: Option<String>,
    },
    /// Show what is installed and whether setup would reinstall.
    Status,
    /// Patch the launcher scripts and rewrite the JVM args file.
    PatchScripts,
    /// Print a shell completion script.
    Completions { shell: Shell },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("SERVERKEEP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let reporter = TracingReporter;

    if let Commands::Completions { shell } = cli.command {
        return completion::write_completions_script(shell, &mut io::stdout());
    }

    let settings = Settings::resolve(&cli.global.overrides())?;
    tracing::debug!(?settings, "resolved settings");
    match cli.command {
        Commands::Setup { force_update } => {
            let outcome = run_setup(&settings, force_update, &reporter)?;
            print_setup_outcome(&outcome);
        }
        Commands::Run { server_args } => {
            run_attached(&settings, server_args.as_deref(), &reporter)?;
        }
        Commands::RunInteractive { server_args } => {
            run_interactive(
                &settings,
                &cli.global.forwarded(),
                server_args.as_deref(),
                &reporter,
            )?;
        }
        Commands::Status => run_status(&settings, &reporter)?,
        Commands::PatchScripts => run_patch_scripts(&settings, &reporter)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests;
