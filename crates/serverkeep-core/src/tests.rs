use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::*;

fn test_layout() -> InstallLayout {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    InstallLayout::new(
        std::env::temp_dir().join(format!("serverkeep-core-test-{}-{nanos}-{id}", std::process::id())),
    )
}

fn touch(path: PathBuf) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent");
    }
    fs::write(path, b"x").expect("must write file");
}

#[test]
fn layout_requires_both_artifacts_and_a_launcher_script() {
    let layout = test_layout();
    layout.ensure_server_dir().expect("must create server dir");
    assert!(!layout.is_installed());
    assert_eq!(layout.missing_artifacts().len(), 2);

    touch(layout.server_jar_path());
    touch(layout.assets_zip_path());
    assert!(!layout.is_installed());
    assert!(layout.missing_artifacts().is_empty());

    touch(layout.start_bat_path());
    assert!(layout.is_installed());

    let _ = fs::remove_dir_all(layout.server_dir());
}

#[test]
fn layout_paths_are_rooted_in_server_dir() {
    let layout = InstallLayout::new("run");
    assert_eq!(
        layout.server_jar_path(),
        PathBuf::from("run").join("Server").join("HytaleServer.jar")
    );
    assert_eq!(layout.state_path(), PathBuf::from("run").join(STATE_FILE_NAME));
    assert_eq!(layout.args_path(), PathBuf::from("run").join(ARGS_FILE_NAME));
    assert_eq!(
        layout.artifact_path(ArtifactKind::AssetsZip),
        layout.assets_zip_path()
    );
}

#[test]
fn channel_comparison_ignores_case() {
    assert_eq!(Channel::new("Release"), Channel::new("release"));
    assert!(Channel::new("PRE-RELEASE").is_pre_release());
    assert!(!Channel::default().is_pre_release());
    assert_eq!(Channel::new("Pre-Release").url_segment(), "pre-release");
    assert!(Channel::new("release").matches(" RELEASE "));
}

#[test]
fn version_request_parses_latest_sentinel_case_insensitively() {
    assert_eq!(VersionRequest::parse("LATEST"), VersionRequest::Latest);
    assert_eq!(VersionRequest::parse(""), VersionRequest::Latest);
    assert_eq!(
        VersionRequest::parse(" 2026.01.13-abc "),
        VersionRequest::Exact("2026.01.13-abc".to_string())
    );
}

#[test]
fn legacy_record_versions_fall_back_to_declared_version() {
    let record = InstallationRecord {
        channel: "release".to_string(),
        declared_version: "1.0.0".to_string(),
        resolved_version: None,
        detected_version: Some("1.0.1".to_string()),
        server_artifact: ArtifactFingerprint::default(),
        assets_artifact: ArtifactFingerprint::default(),
    };
    assert_eq!(record.resolved_version(), "1.0.0");
    assert_eq!(record.detected_version(), "1.0.1");
}

#[test]
fn fingerprint_with_blank_hash_is_incomplete() {
    let mut fingerprint = ArtifactFingerprint {
        size_bytes: Some(1),
        last_modified_epoch_ms: Some(2),
        sha256_hex: Some("  ".to_string()),
    };
    assert!(!fingerprint.is_complete());
    fingerprint.sha256_hex = Some("ab".to_string());
    assert!(fingerprint.is_complete());
    fingerprint.size_bytes = None;
    assert!(!fingerprint.is_complete());
}

#[test]
fn terminal_templates_substitute_the_command_line() {
    let tokens = TerminalKind::GnomeTerminal.expand("/opt/serverkeep run");
    assert_eq!(
        tokens,
        vec![
            "gnome-terminal",
            "--",
            "bash",
            "-lc",
            "/opt/serverkeep run; exec bash"
        ]
    );

    let custom = TerminalKind::Custom(vec!["alacritty".to_string(), "-e".to_string()]);
    assert_eq!(custom.expand("serverkeep run"), vec!["alacritty", "-e", "serverkeep run"]);
}

#[test]
fn every_named_terminal_template_has_a_placeholder() {
    for kind in [
        TerminalKind::Ghostty,
        TerminalKind::Kitty,
        TerminalKind::Konsole,
        TerminalKind::GnomeTerminal,
        TerminalKind::XTerminalEmulator,
        TerminalKind::Xterm,
        TerminalKind::WindowsConsole,
    ] {
        assert!(
            kind.template()
                .iter()
                .any(|token| token.contains(COMMAND_PLACEHOLDER)),
            "{} template lacks placeholder",
            kind.name()
        );
        assert_eq!(TerminalKind::parse(kind.name()), Some(kind.clone()));
    }
    assert_eq!(TerminalKind::parse("alacritty"), None);
}

#[test]
fn recording_reporter_keeps_event_order_and_filters_warnings() {
    let reporter = RecordingReporter::new();
    reporter.report(Report::InstallationCurrent);
    reporter.report(Report::TerminalFallback);
    assert_eq!(
        reporter.events(),
        vec![Report::InstallationCurrent, Report::TerminalFallback]
    );
    assert_eq!(reporter.warnings(), vec![Report::TerminalFallback]);
}
