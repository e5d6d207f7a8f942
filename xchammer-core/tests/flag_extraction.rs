use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;
use xchammer_core::build_log::{CompileInvocation, LogEntry};
use xchammer_core::flags::{
    diagnostic_flags, flags_from_transcript, render_bzl, stage_fixture,
};
use xchammer_core::CommandError;

fn entry(line: usize, arguments: &[&str]) -> LogEntry {
    LogEntry::Entry(CompileInvocation {
        section: "CompileC a.o a.c".to_string(),
        line,
        directory: None,
        arguments: arguments.iter().map(|a| a.to_string()).collect(),
    })
}

fn other(line: usize) -> LogEntry {
    LogEntry::Other {
        line,
        text: "note: building".to_string(),
    }
}

#[test]
fn takes_the_first_invocation_only() {
    let entries = vec![
        other(1),
        entry(2, &["clang", "-Wfoo", "-O2", "-Wbar"]),
        entry(3, &["clang", "-Wbaz"]),
    ];
    assert_eq!(diagnostic_flags(&entries).unwrap(), vec!["-Wfoo", "-Wbar"]);
}

#[test]
fn skips_invocations_without_diagnostic_flags() {
    let entries = vec![
        entry(1, &["swiftc", "-O", "-c", "a.swift"]),
        entry(2, &["clang", "-Wall", "-Wl,-dead_strip", "-W"]),
    ];
    assert_eq!(
        diagnostic_flags(&entries).unwrap(),
        vec!["-Wall", "-Wl,-dead_strip", "-W"]
    );
}

#[test]
fn no_usable_invocation_is_missing_flags() {
    let err = diagnostic_flags(&[other(1), other(2)]).unwrap_err();
    assert!(matches!(err, CommandError::MissingFlags));

    let err = diagnostic_flags(&[entry(1, &["clang", "-c", "a.c"])]).unwrap_err();
    assert_eq!(err.kind(), "missingFlags");

    assert!(matches!(
        diagnostic_flags(&[]),
        Err(CommandError::MissingFlags)
    ));
}

#[test]
fn flags_come_from_a_real_transcript() {
    let log = "\
CompileC /tmp/a.o /src/a.m normal arm64 objective-c
    cd /src
    export LANG=en_US.US-ASCII
    /usr/bin/clang -x objective-c -Wall -fobjc-arc -Wno-unused-parameter -c /src/a.m
CompileC /tmp/b.o /src/b.m normal arm64 objective-c
    /usr/bin/clang -Wextra -c /src/b.m
";
    assert_eq!(
        flags_from_transcript(log).unwrap(),
        vec!["-Wall", "-Wno-unused-parameter"]
    );
    assert!(matches!(
        flags_from_transcript("** BUILD FAILED **\n"),
        Err(CommandError::MissingFlags)
    ));
}

#[test]
fn renders_a_starlark_list() {
    let flags = vec!["-Wall".to_string(), "-Wno-unused-parameter".to_string()];
    assert_eq!(
        render_bzl(&flags),
        "# This file is maintained by XCHammer\n\
         DIAG_FLAGS = [\n    \"-Wall\",\n    \"-Wno-unused-parameter\",\n]"
    );
}

#[test]
fn rendered_flags_are_escaped() {
    let flags = vec![r#"-Wformat="x\y""#.to_string()];
    assert!(render_bzl(&flags).contains(r#"    "-Wformat=\"x\\y\"","#));
}

#[test]
fn stages_fixtures_and_config_in_a_unique_directory() {
    let src = tempdir().unwrap();
    let fixtures = src.path().join("Fixtures");
    fs::create_dir_all(fixtures.join("iOSApp/iOSApp.xcodeproj")).unwrap();
    fs::write(fixtures.join("iOSApp/main.m"), "int main() { return 0; }\n").unwrap();
    fs::write(fixtures.join("iOSApp/iOSApp.xcodeproj/project.pbxproj"), "{}").unwrap();
    let xcconfig = src.path().join("Warnings.xcconfig");
    fs::write(&xcconfig, "WARNING_CFLAGS = -Wall\n").unwrap();

    let scratch = tempdir().unwrap();
    let first = stage_fixture(scratch.path(), &fixtures, &xcconfig, "iOSApp").unwrap();
    let second = stage_fixture(scratch.path(), &fixtures, &xcconfig, "iOSApp").unwrap();

    assert_ne!(first.root, second.root);
    assert_eq!(first.root.parent(), Some(scratch.path()));
    assert_eq!(first.build_dir, first.root.join("Fixtures/iOSApp"));
    assert!(first.build_dir.join("main.m").is_file());
    assert!(first
        .build_dir
        .join("iOSApp.xcodeproj/project.pbxproj")
        .is_file());
    assert_eq!(
        fs::read_to_string(first.root.join("Config.xcconfig")).unwrap(),
        "WARNING_CFLAGS = -Wall\n"
    );
}

#[test]
fn staging_without_fixtures_is_an_io_error() {
    let scratch = tempdir().unwrap();
    let xcconfig = scratch.path().join("Config.xcconfig");
    fs::write(&xcconfig, "").unwrap();

    let err = stage_fixture(
        scratch.path(),
        &PathBuf::from("/nonexistent/Fixtures"),
        &xcconfig,
        "iOSApp",
    )
    .unwrap_err();
    assert_eq!(err.kind(), "io");
    assert!(err.to_string().contains("/nonexistent/Fixtures"));
}

#[cfg(unix)]
mod shell {
    use super::*;
    use xchammer_core::flags::{capture_transcript, extract_flags};

    #[tokio::test]
    async fn captures_stdout_and_stderr_in_the_working_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let transcript = capture_transcript("cat marker.txt; echo ' err' >&2", dir.path())
            .await
            .unwrap();
        assert_eq!(transcript, "here err\n");
    }

    #[tokio::test]
    async fn failing_builds_still_yield_their_log() {
        let dir = tempdir().unwrap();
        let transcript = capture_transcript("echo partial; exit 65", dir.path())
            .await
            .unwrap();
        assert_eq!(transcript, "partial\n");
    }

    #[tokio::test]
    async fn a_missing_working_directory_is_a_shell_error() {
        let err = capture_transcript("true", &PathBuf::from("/nonexistent/build/dir"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "shell");
    }

    #[tokio::test]
    async fn extracts_flags_from_the_build_output() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("build.log"),
            "CompileC a.o a.c\n    clang -Wall -Wshadow -c a.c\n",
        )
        .unwrap();

        let flags = extract_flags("cat build.log; exit 1", dir.path()).await.unwrap();
        assert_eq!(flags, vec!["-Wall", "-Wshadow"]);
    }
}
