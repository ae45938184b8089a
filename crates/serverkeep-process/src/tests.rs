use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serverkeep_core::{InstallLayout, RecordingReporter, Report, TerminalKind};

use super::*;

fn test_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "serverkeep-process-{label}-{}-{nanos}-{id}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("must create test dir");
    dir
}

fn scripted_exits(codes: &[i32]) -> (RefCell<VecDeque<i32>>, RefCell<u32>) {
    (RefCell::new(codes.iter().copied().collect()), RefCell::new(0))
}

#[test]
fn restart_code_relaunches_until_clean_exit() {
    let (codes, launches) = scripted_exits(&[8, 8, 0]);
    let reporter = RecordingReporter::new();

    let result = supervise(
        || {
            *launches.borrow_mut() += 1;
            Ok(codes.borrow_mut().pop_front().expect("launched too often"))
        },
        &reporter,
    );

    assert_eq!(result.expect("server stops cleanly"), 3);
    assert_eq!(*launches.borrow(), 3);
    assert_eq!(
        reporter.events(),
        vec![
            Report::ServerRestartRequested { launches: 1 },
            Report::ServerRestartRequested { launches: 2 },
        ]
    );
}

#[test]
fn unexpected_exit_code_is_fatal() {
    let (codes, launches) = scripted_exits(&[8, 3]);

    let err = supervise(
        || {
            *launches.borrow_mut() += 1;
            Ok(codes.borrow_mut().pop_front().expect("launched too often"))
        },
        &RecordingReporter::new(),
    )
    .expect_err("exit code 3 must fail");

    assert_eq!(*launches.borrow(), 2);
    assert!(matches!(err, SupervisorError::ServerFailed { code: 3 }));
    let message = err.to_string();
    assert!(message.contains('3'));
    assert!(message.contains("--no-daemon"));
}

#[test]
fn spawn_failure_stops_supervision() {
    let mut launches = 0;
    let err = supervise(
        || {
            launches += 1;
            Err(SupervisorError::Spawn {
                program: "bash".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no bash"),
            })
        },
        &RecordingReporter::new(),
    )
    .expect_err("spawn failure is an error");
    assert_eq!(launches, 1);
    assert_eq!(err.to_string(), "failed to start bash");
}

#[test]
fn exit_codes_map_to_states() {
    assert_eq!(SupervisorState::after_exit(0), SupervisorState::Succeeded);
    assert_eq!(
        SupervisorState::after_exit(RESTART_EXIT_CODE),
        SupervisorState::Restarting
    );
    assert_eq!(SupervisorState::after_exit(-1), SupervisorState::Failed(-1));
    assert_eq!(SupervisorState::after_exit(137), SupervisorState::Failed(137));
}

#[test]
fn runtime_major_parsing_handles_common_layouts() {
    assert_eq!(java_major_from_dir_name("jdk-25.0.1+8"), Some(25));
    assert_eq!(java_major_from_dir_name("temurin-21"), Some(21));
    assert_eq!(java_major_from_dir_name("java-21-openjdk-amd64"), Some(21));
    assert_eq!(java_major_from_dir_name("java-1.8.0-openjdk"), Some(8));
    assert_eq!(java_major_from_dir_name("default-java"), None);
}

#[test]
fn managed_runtime_is_preferred() {
    let root = test_dir("runtime-managed");
    let managed = root.join("jdks");
    fs::create_dir_all(managed.join("jdk-21.0.2").join("bin")).expect("must create jdk 21");
    fs::create_dir_all(managed.join("jdk-25.0.1").join("bin")).expect("must create jdk 25");
    fs::create_dir_all(managed.join("jdk-25-broken")).expect("must create broken jdk");
    let current = root.join("current");
    fs::create_dir_all(current.join("bin")).expect("must create current");

    let probe = RuntimeProbe {
        managed_roots: vec![root.join("missing-root"), managed.clone()],
        current_home: Some(current.clone()),
    };
    assert_eq!(
        resolve_runtime_home(&probe, 25),
        Some(managed.join("jdk-25.0.1"))
    );
    assert_eq!(resolve_runtime_home(&probe, 17), Some(current));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn runtime_falls_back_to_parent_then_none() {
    let root = test_dir("runtime-parent");
    let jdk = root.join("jdk");
    let jre = jdk.join("jre");
    fs::create_dir_all(jdk.join("bin")).expect("must create jdk bin");
    fs::create_dir_all(&jre).expect("must create jre");

    let nested = RuntimeProbe {
        managed_roots: Vec::new(),
        current_home: Some(jre),
    };
    assert_eq!(resolve_runtime_home(&nested, 25), Some(jdk));

    let bare = RuntimeProbe {
        managed_roots: Vec::new(),
        current_home: Some(root.join("nowhere").join("java")),
    };
    assert_eq!(resolve_runtime_home(&bare, 25), None);
    assert_eq!(resolve_runtime_home(&RuntimeProbe::default(), 25), None);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn attached_command_sets_runtime_environment() {
    let layout = InstallLayout::new("run");
    let home = PathBuf::from("/opt/jdk-25");
    let command = attached_command(
        &layout,
        Path::new("/srv/run/start.sh"),
        &["--bind".to_string(), "0.0.0.0:5520".to_string()],
        Some(&home),
    );

    assert_eq!(command.get_current_dir(), Some(Path::new("run")));
    let args = command.get_args().collect::<Vec<_>>();
    assert_eq!(args.last(), Some(&OsStr::new("0.0.0.0:5520")));
    let envs = command
        .get_envs()
        .filter_map(|(key, value)| Some((key.to_os_string(), value?.to_os_string())))
        .collect::<Vec<_>>();
    assert!(envs
        .iter()
        .any(|(key, value)| key == "JAVA_HOME" && Path::new(value) == home));
    if cfg!(unix) {
        assert_eq!(command.get_program(), "bash");
        assert_eq!(args.first(), Some(&OsStr::new("/srv/run/start.sh")));
    }
}

#[test]
fn runtime_bin_goes_first_on_path() {
    let bin = PathBuf::from("/opt/jdk-25/bin");
    let existing = std::env::join_paths([PathBuf::from("/usr/bin"), PathBuf::from("/bin")])
        .expect("must join paths");

    let joined = path_with_runtime(&bin, Some(existing)).expect("must build PATH");
    let entries = std::env::split_paths(&joined).collect::<Vec<_>>();
    assert_eq!(
        entries,
        vec![bin.clone(), PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
    );
    assert_eq!(
        path_with_runtime(&bin, None).map(|path| std::env::split_paths(&path).count()),
        Some(1)
    );
}

#[test]
fn run_server_names_missing_files() {
    let layout = InstallLayout::new(test_dir("run-missing"));
    let err = run_server(&layout, &RunOptions::default(), &RecordingReporter::new())
        .expect_err("nothing installed");
    assert!(err.to_string().contains("Assets.zip"));

    fs::write(layout.assets_zip_path(), b"assets").expect("must write assets");
    let err = run_server(&layout, &RunOptions::default(), &RecordingReporter::new())
        .expect_err("jar missing");
    assert!(err.to_string().contains("HytaleServer.jar"));

    let jar = layout.server_jar_path();
    fs::create_dir_all(jar.parent().expect("jar has parent")).expect("must create Server dir");
    fs::write(&jar, b"jar").expect("must write jar");
    let err = run_server(&layout, &RunOptions::default(), &RecordingReporter::new())
        .expect_err("script missing");
    assert!(err
        .to_string()
        .contains(&layout.platform_script_path().display().to_string()));

    let _ = fs::remove_dir_all(layout.server_dir());
}

#[cfg(unix)]
#[test]
fn run_server_restarts_real_script() {
    let layout = InstallLayout::new(test_dir("run-script"));
    fs::write(layout.assets_zip_path(), b"assets").expect("must write assets");
    let jar = layout.server_jar_path();
    fs::create_dir_all(jar.parent().expect("jar has parent")).expect("must create Server dir");
    fs::write(&jar, b"jar").expect("must write jar");
    fs::write(
        layout.start_sh_path(),
        "#!/bin/bash\necho run >> launches.log\nif [ \"$(wc -l < launches.log)\" -lt 2 ]; then exit 8; fi\nexit 0\n",
    )
    .expect("must write start.sh");

    let reporter = RecordingReporter::new();
    let launches = run_server(&layout, &RunOptions::default(), &reporter).expect("must run");
    assert_eq!(launches, 2);
    assert_eq!(
        fs::read_to_string(layout.server_dir().join("launches.log")).expect("read log"),
        "run\nrun\n"
    );
    assert!(reporter
        .events()
        .contains(&Report::RuntimeHomeResolved { path: None }));

    let _ = fs::remove_dir_all(layout.server_dir());
}

#[derive(Default)]
struct FakeSpawner {
    working: Vec<&'static str>,
    detached: RefCell<Vec<Vec<String>>>,
    attached: RefCell<Vec<Vec<String>>>,
}

impl ProcessSpawner for FakeSpawner {
    fn spawn_detached(&self, argv: &[String]) -> io::Result<()> {
        self.detached.borrow_mut().push(argv.to_vec());
        if self.working.contains(&argv[0].as_str()) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "not installed"))
        }
    }

    fn run_attached(&self, argv: &[String]) -> io::Result<i32> {
        self.attached.borrow_mut().push(argv.to_vec());
        Ok(42)
    }
}

#[test]
fn terminal_chain_stops_at_first_success() {
    let spawner = FakeSpawner {
        working: vec!["konsole", "xterm"],
        ..FakeSpawner::default()
    };
    let reporter = RecordingReporter::new();
    let kinds = [
        TerminalKind::XTerminalEmulator,
        TerminalKind::GnomeTerminal,
        TerminalKind::Konsole,
        TerminalKind::Xterm,
    ];

    let launched = launch_in_terminal(
        &kinds,
        "serverkeep run",
        &["serverkeep".to_string(), "run".to_string()],
        &spawner,
        &reporter,
    )
    .expect("must launch");

    assert_eq!(launched, TerminalLaunch::LaunchedIn(TerminalKind::Konsole));
    let detached = spawner.detached.borrow();
    assert_eq!(detached.len(), 3);
    assert_eq!(
        detached[2],
        vec!["konsole", "-e", "bash", "-lc", "serverkeep run; exec bash"]
    );
    assert!(spawner.attached.borrow().is_empty());
    assert_eq!(reporter.warnings().len(), 2);
}

#[test]
fn terminal_chain_falls_back_and_ignores_exit_code() {
    let spawner = FakeSpawner::default();
    let reporter = RecordingReporter::new();
    let fallback = vec!["serverkeep".to_string(), "run".to_string()];

    let launched = launch_in_terminal(
        &[TerminalKind::Custom(vec!["my-term".to_string(), "--exec".to_string()])],
        "serverkeep run",
        &fallback,
        &spawner,
        &reporter,
    )
    .expect("fallback exit code is ignored");

    assert_eq!(launched, TerminalLaunch::FellBack);
    assert_eq!(
        spawner.detached.borrow()[0],
        vec!["my-term", "--exec", "serverkeep run"]
    );
    assert_eq!(*spawner.attached.borrow(), vec![fallback]);
    assert!(reporter.events().contains(&Report::TerminalFallback));
}

#[test]
fn windows_console_arguments_keep_quoted_paths_intact() {
    let command_line = r#""C:\Program Files\serverkeep\serverkeep.exe" --server-dir "D:\my server" run"#;
    let argv = TerminalKind::WindowsConsole.expand(command_line);
    assert!(is_cmd(&argv[0]));
    assert!(is_cmd(r"C:\Windows\System32\CMD.EXE"));
    assert!(!is_cmd("bash"));

    assert_eq!(
        cmd_arguments(&argv[1..]),
        r#"/c start "Hytale Server" cmd /k ""C:\Program Files\serverkeep\serverkeep.exe" --server-dir "D:\my server" run""#
    );
    assert!(!cmd_arguments(&argv[1..]).contains("\\\""));
    assert_eq!(cmd_arguments(&[]), "");
}
