use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use serverkeep_core::{Channel, TerminalKind, VersionRequest};

use crate::config::{parse_terminal_flag, split_server_args, ConfigFile, Overrides, Settings};
use crate::flows::{quote_arg, reinvocation_argv};
use crate::render::{render_status_line, resolve_output_style, OutputStyle};
use crate::{Cli, Commands};

fn test_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "serverkeep-cli-{label}-{}-{nanos}-{id}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("must create test dir");
    dir
}

#[test]
fn defaults_apply_without_config_or_flags() {
    let settings =
        Settings::merge(ConfigFile::default(), &Overrides::default()).expect("must merge");
    assert_eq!(settings.server_dir, PathBuf::from("run"));
    assert_eq!(settings.channel, Channel::new("release"));
    assert_eq!(settings.version, VersionRequest::Latest);
    assert!(settings.jvm_args.is_empty());
    assert_eq!(settings.runtime_version, 25);
    assert_eq!(settings.work_dir, PathBuf::from("build/serverkeep/downloader"));
    assert!(settings.metadata_url.contains("{channel}"));
    assert_eq!(
        settings.downloader_url,
        "https://downloader.hytale.com/hytale-downloader.zip"
    );
    assert_eq!(
        settings.terminal_kinds(),
        serverkeep_core::default_terminal_kinds()
    );
}

#[test]
fn flags_override_config_file_values() {
    let file = ConfigFile::parse(
        r#"
server_dir = "servers/main"
channel = "pre-release"
version = "1.0.0"
jvm_args = ["-Xmx4G"]
terminal = "kitty"
runtime_version = 21
"#,
    )
    .expect("must parse config");

    let from_file = Settings::merge(
        ConfigFile::parse(
            r#"
channel = "pre-release"
version = "1.0.0"
jvm_args = ["-Xmx4G"]
terminal = "kitty"
"#,
        )
        .expect("must parse config"),
        &Overrides::default(),
    )
    .expect("must merge");
    assert_eq!(from_file.channel, Channel::new("pre-release"));
    assert_eq!(from_file.version, VersionRequest::Exact("1.0.0".to_string()));
    assert_eq!(from_file.jvm_args, vec!["-Xmx4G".to_string()]);
    assert_eq!(from_file.terminal_kinds(), vec![TerminalKind::Kitty]);

    let overrides = Overrides {
        server_dir: Some(PathBuf::from("elsewhere")),
        channel: Some("release".to_string()),
        version: Some("LATEST".to_string()),
        jvm_args: vec!["-Xmx8G".to_string(), "-XX:+UseZGC".to_string()],
        terminal: Some("xterm".to_string()),
        ..Overrides::default()
    };
    let merged = Settings::merge(file, &overrides).expect("must merge");
    assert_eq!(merged.server_dir, PathBuf::from("elsewhere"));
    assert_eq!(merged.channel, Channel::new("release"));
    assert_eq!(merged.version, VersionRequest::Latest);
    assert_eq!(merged.jvm_args.len(), 2);
    assert_eq!(merged.terminal, Some(TerminalKind::Xterm));
    assert_eq!(merged.runtime_version, 21);
}

#[test]
fn config_file_directories_are_relative_to_the_file() {
    let dir = test_dir("config");
    let path = dir.join("serverkeep.toml");
    fs::write(
        &path,
        "server_dir = \"run\"\nwork_dir = \"tmp/dl\"\nterminal = [\"alacritty\", \"-e\", \"{command}\"]\n",
    )
    .expect("must write config");

    let settings = Settings::resolve(&Overrides {
        config: Some(path),
        ..Overrides::default()
    })
    .expect("must resolve");
    assert_eq!(settings.server_dir, dir.join("run"));
    assert_eq!(settings.work_dir, dir.join("tmp").join("dl"));
    assert_eq!(
        settings.terminal,
        Some(TerminalKind::Custom(vec![
            "alacritty".to_string(),
            "-e".to_string(),
            "{command}".to_string(),
        ]))
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_is_an_error() {
    assert!(ConfigFile::parse("unknown_key = 1").is_err());
    assert!(ConfigFile::parse("terminal = \"not-a-terminal\"").is_err());
    assert!(ConfigFile::parse("terminal = []").is_err());

    let missing = test_dir("config-missing").join("absent.toml");
    let err = Settings::resolve(&Overrides {
        config: Some(missing.clone()),
        ..Overrides::default()
    })
    .expect_err("explicit config must exist");
    assert!(format!("{err:#}").contains(&missing.display().to_string()));
}

#[test]
fn terminal_flag_accepts_names_and_templates() {
    assert_eq!(
        parse_terminal_flag("GNOME-TERMINAL").expect("known name"),
        TerminalKind::GnomeTerminal
    );
    assert_eq!(
        parse_terminal_flag("wezterm start -- {command}").expect("template"),
        TerminalKind::Custom(vec![
            "wezterm".to_string(),
            "start".to_string(),
            "--".to_string(),
            "{command}".to_string(),
        ])
    );
    assert!(parse_terminal_flag("mystery").is_err());
}

#[test]
fn server_args_split_on_whitespace() {
    assert_eq!(
        split_server_args(Some("  --bind 0.0.0.0:5520\t--auth-mode offline ")),
        vec!["--bind", "0.0.0.0:5520", "--auth-mode", "offline"]
    );
    assert!(split_server_args(Some("   ")).is_empty());
    assert!(split_server_args(None).is_empty());
}

#[test]
fn reinvocation_forwards_flags_and_server_args() {
    let argv = reinvocation_argv(
        PathBuf::from("/opt/serverkeep"),
        &["--server-dir".to_string(), "my run".to_string()],
        Some(" --bind 0.0.0.0:5520 "),
    );
    assert_eq!(
        argv,
        vec![
            "/opt/serverkeep",
            "--server-dir",
            "my run",
            "run",
            "--server-args",
            "--bind 0.0.0.0:5520",
        ]
    );
    let line = argv
        .iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(
        line,
        "/opt/serverkeep --server-dir \"my run\" run --server-args \"--bind 0.0.0.0:5520\""
    );

    let bare = reinvocation_argv(PathBuf::from("serverkeep"), &[], Some("   "));
    assert_eq!(bare, vec!["serverkeep", "run"]);
}

#[test]
fn global_flags_are_forwarded_to_the_child_run() {
    let cli = Cli::try_parse_from([
        "serverkeep",
        "run-interactive",
        "--channel",
        "pre-release",
        "--jvm-arg",
        "-Xmx4G",
        "--server-args",
        "--bind 0.0.0.0:5520",
    ])
    .expect("must parse");

    assert_eq!(
        cli.global.forwarded(),
        vec!["--channel", "pre-release", "--jvm-arg", "-Xmx4G"]
    );
    match cli.command {
        Commands::RunInteractive { server_args } => {
            assert_eq!(server_args.as_deref(), Some("--bind 0.0.0.0:5520"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn status_lines_follow_output_style() {
    assert_eq!(resolve_output_style(true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false), OutputStyle::Plain);
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed server 1.0"),
        "installed server 1.0"
    );
    let rich = render_status_line(OutputStyle::Rich, "warn", "no setup state recorded");
    assert!(rich.contains("[WARN]"));
    assert!(rich.ends_with(" no setup state recorded"));
}

#[test]
fn completions_mention_subcommands() {
    let mut out = Vec::new();
    crate::completion::write_completions_script(clap_complete::Shell::Bash, &mut out)
        .expect("must generate completions");
    let script = String::from_utf8(out).expect("utf8 script");
    assert!(script.contains("run-interactive"));
    assert!(script.contains("patch-scripts"));
}
