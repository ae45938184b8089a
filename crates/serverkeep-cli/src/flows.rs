use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serverkeep_core::{InstallLayout, InstallationRecord, Report, Reporter};
use serverkeep_installer::{
    evaluate_staleness, install, load_installation_record, write_args_file, ensure_scripts_patched,
    InstallOptions, InstallRequest, OfficialDownloaderBundle, RetryPolicy, Staleness,
};
use serverkeep_process::{
    launch_in_terminal, run_server, RunOptions, RuntimeProbe, SystemSpawner, TerminalLaunch,
};
use serverkeep_registry::{HttpDownloader, HttpMetadataSource};
use serverkeep_resolver::{detect_installed_version, VersionResolver};

use crate::config::{split_server_args, Settings};
use crate::render::print_status;

#[derive(Debug)]
pub(crate) enum SetupOutcome {
    AlreadyCurrent,
    Installed(InstallationRecord),
}

fn install_request(settings: &Settings, force_update: bool) -> InstallRequest {
    InstallRequest {
        channel: settings.channel.clone(),
        version: settings.version.clone(),
        force_update,
    }
}

/// Installs or refreshes the server when the installation is stale.
pub(crate) fn run_setup(
    settings: &Settings,
    force_update: bool,
    reporter: &dyn Reporter,
) -> Result<SetupOutcome> {
    let layout = InstallLayout::new(&settings.server_dir);
    let resolver = VersionResolver::new(
        HttpMetadataSource::new(settings.metadata_url.clone()),
        reporter,
    );
    let request = install_request(settings, force_update);
    let record = load_installation_record(&layout, reporter);

    match evaluate_staleness(&request, record.as_ref(), &layout, &resolver, reporter) {
        Staleness::Current => {
            reporter.report(Report::InstallationCurrent);
            write_args_file(&layout, &settings.jvm_args)?;
            Ok(SetupOutcome::AlreadyCurrent)
        }
        Staleness::Stale(reason) => {
            reporter.report(Report::ReinstallRequired {
                reason: reason.to_string(),
            });
            let options = InstallOptions {
                request,
                jvm_args: settings.jvm_args.clone(),
                work_dir: settings.work_dir.clone(),
                retry: RetryPolicy::default(),
            };
            let source = OfficialDownloaderBundle::new(HttpDownloader::new())
                .with_downloader_url(settings.downloader_url.clone());
            let record = install(&layout, &options, &source, &resolver, reporter)?;
            Ok(SetupOutcome::Installed(record))
        }
    }
}

pub(crate) fn print_setup_outcome(outcome: &SetupOutcome) {
    match outcome {
        SetupOutcome::AlreadyCurrent => print_status("ok", "server installation is up to date"),
        SetupOutcome::Installed(record) => print_status(
            "ok",
            &format!(
                "installed server {} (channel {}, build {})",
                record.resolved_version(),
                record.channel,
                record.detected_version()
            ),
        ),
    }
}

pub(crate) fn run_attached(
    settings: &Settings,
    server_args: Option<&str>,
    reporter: &dyn Reporter,
) -> Result<()> {
    let outcome = run_setup(settings, false, reporter)?;
    print_setup_outcome(&outcome);

    let layout = InstallLayout::new(&settings.server_dir);
    let options = RunOptions {
        extra_args: split_server_args(server_args),
        runtime_major: settings.runtime_version,
        probe: RuntimeProbe::from_env(),
    };
    run_server(&layout, &options, reporter)?;
    print_status("ok", "server stopped");
    Ok(())
}

/// Re-runs this binary with `run` inside a terminal emulator window.
pub(crate) fn run_interactive(
    settings: &Settings,
    forwarded: &[String],
    server_args: Option<&str>,
    reporter: &dyn Reporter,
) -> Result<()> {
    let outcome = run_setup(settings, false, reporter)?;
    print_setup_outcome(&outcome);

    let argv = reinvocation_argv(current_exe()?, forwarded, server_args);
    let command_line = argv
        .iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ");

    match launch_in_terminal(
        &settings.terminal_kinds(),
        &command_line,
        &argv,
        &SystemSpawner,
        reporter,
    )? {
        TerminalLaunch::LaunchedIn(kind) => {
            print_status("ok", &format!("server started in {}", kind.name()));
        }
        TerminalLaunch::FellBack => print_status("ok", "server stopped"),
    }
    Ok(())
}

fn current_exe() -> Result<PathBuf> {
    env::current_exe().context("failed to locate the serverkeep executable")
}

/// Arguments for the child `serverkeep run` invocation.
pub(crate) fn reinvocation_argv(
    exe: PathBuf,
    forwarded: &[String],
    server_args: Option<&str>,
) -> Vec<String> {
    let mut argv = vec![exe.display().to_string()];
    argv.extend(forwarded.iter().cloned());
    argv.push("run".to_string());
    if let Some(server_args) = server_args.map(str::trim).filter(|args| !args.is_empty()) {
        argv.push("--server-args".to_string());
        argv.push(server_args.to_string());
    }
    argv
}

/// Wraps an argument in double quotes when it contains whitespace.
pub(crate) fn quote_arg(arg: &str) -> String {
    let trimmed = arg.trim();
    if trimmed.chars().any(char::is_whitespace) {
        format!("\"{trimmed}\"")
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn run_status(settings: &Settings, reporter: &dyn Reporter) -> Result<()> {
    let layout = InstallLayout::new(&settings.server_dir);
    print_status("info", &format!("server dir: {}", layout.server_dir().display()));

    if !layout.is_installed() {
        print_status("warn", "server is not installed");
        for missing in layout.missing_artifacts() {
            print_status("warn", &format!("missing {}", missing.display()));
        }
        return Ok(());
    }
    print_status(
        "info",
        &format!("installed build: {}", detect_installed_version(&layout)),
    );

    let Some(record) = load_installation_record(&layout, reporter) else {
        print_status("warn", "no setup state recorded");
        return Ok(());
    };
    print_status(
        "info",
        &format!(
            "recorded: channel {} version {} build {}",
            record.channel,
            record.resolved_version(),
            record.detected_version()
        ),
    );

    let resolver = VersionResolver::new(
        HttpMetadataSource::new(settings.metadata_url.clone()),
        reporter,
    );
    let request = install_request(settings, false);
    match evaluate_staleness(&request, Some(&record), &layout, &resolver, reporter) {
        Staleness::Current => print_status("ok", "installation is up to date"),
        Staleness::Stale(reason) => print_status("warn", &format!("setup would reinstall: {reason}")),
    }
    Ok(())
}

pub(crate) fn run_patch_scripts(settings: &Settings, reporter: &dyn Reporter) -> Result<()> {
    let layout = InstallLayout::new(&settings.server_dir);
    let summary = ensure_scripts_patched(&layout, reporter)?;
    let args_path = write_args_file(&layout, &settings.jvm_args)?;
    if summary.written.is_empty() {
        print_status("ok", "launcher scripts already patched");
    }
    for script in &summary.written {
        print_status("ok", &format!("patched {}", script.display()));
    }
    print_status("ok", &format!("wrote {}", args_path.display()));
    Ok(())
}
