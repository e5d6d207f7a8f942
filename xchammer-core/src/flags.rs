//! Diagnostic flag extraction: build → capture → parse → filter → render.
//!
//! The flags of the *first* compiler invocation that carries any diagnostic flag are
//! taken as-is. Flags are never merged across invocations.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::build_log::{self, LogEntry};
use crate::error::CommandError;

/// Arguments starting with this marker control compiler diagnostics.
pub const DIAGNOSTIC_PREFIX: &str = "-W";

/// Header line of the generated Starlark file.
pub const GENERATED_HEADER: &str = "# This file is maintained by XCHammer";

/// Name of the generated list.
pub const FLAGS_LIST_NAME: &str = "DIAG_FLAGS";

/// Runs `command` through `/bin/bash -c '<command> 2>&1'` in `working_dir` and returns
/// its stdout followed by whatever still reached stderr. Only the last command of the
/// script has stderr folded into stdout, so earlier stderr output is appended after all
/// of stdout rather than interleaved. A failing build is not an error: its log can still
/// hold usable compiler invocations.
pub async fn capture_transcript(command: &str, working_dir: &Path) -> Result<String, CommandError> {
    let script = format!("{command} 2>&1");
    info!(command = %command, dir = %working_dir.display(), "Running build");

    let output = Command::new("/bin/bash")
        .arg("-c")
        .arg(&script)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| {
            error!(error = ?source, command = %command, "Failed to launch build");
            CommandError::Shell {
                command: command.to_string(),
                source,
            }
        })?;

    if !output.status.success() {
        warn!(status = ?output.status, "Build exited unsuccessfully, parsing its log anyway");
    }

    let mut transcript = String::from_utf8_lossy(&output.stdout).into_owned();
    transcript.push_str(&String::from_utf8_lossy(&output.stderr));
    debug!(bytes = transcript.len(), "Captured build transcript");
    Ok(transcript)
}

/// Diagnostic flags of the first invocation that has any, in their original order.
pub fn diagnostic_flags(entries: &[LogEntry]) -> Result<Vec<String>, CommandError> {
    let flags = entries
        .iter()
        .filter_map(LogEntry::invocation)
        .map(|invocation| {
            invocation
                .arguments
                .iter()
                .filter(|arg| arg.starts_with(DIAGNOSTIC_PREFIX))
                .cloned()
                .collect::<Vec<_>>()
        })
        .find(|flags| !flags.is_empty());

    match flags {
        Some(flags) => {
            info!(count = flags.len(), "Selected diagnostic flags");
            Ok(flags)
        }
        None => {
            error!("No compiler invocation with diagnostic flags in the transcript");
            Err(CommandError::MissingFlags)
        }
    }
}

/// Parses a transcript and returns its diagnostic flags.
pub fn flags_from_transcript(transcript: &str) -> Result<Vec<String>, CommandError> {
    let entries = build_log::parse(transcript);
    let invocations = entries.iter().filter(|e| e.invocation().is_some()).count();
    debug!(lines = entries.len(), invocations, "Parsed build transcript");
    diagnostic_flags(&entries)
}

/// Runs the build and returns the diagnostic flags found in its transcript.
pub async fn extract_flags(command: &str, working_dir: &Path) -> Result<Vec<String>, CommandError> {
    let transcript = capture_transcript(command, working_dir).await?;
    flags_from_transcript(&transcript)
}

/// Renders the flags as a Starlark list, one quoted flag per line.
pub fn render_bzl(flags: &[String]) -> String {
    let items = flags
        .iter()
        .map(|flag| format!("    \"{}\",", escape(flag)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{GENERATED_HEADER}\n{FLAGS_LIST_NAME} = [\n{items}\n]")
}

fn escape(flag: &str) -> String {
    flag.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A fixture copied to a scratch directory, ready to build.
#[derive(Debug, Clone)]
pub struct StagedFixture {
    /// The unique scratch directory. Not removed automatically.
    pub root: PathBuf,
    /// Directory the build runs in.
    pub build_dir: PathBuf,
}

/// Copies `fixtures` to `<scratch>/<uuid>/Fixtures` and `xcconfig` to
/// `<scratch>/<uuid>/Config.xcconfig`. The build directory is `Fixtures/<project_dir>`.
pub fn stage_fixture(
    scratch: &Path,
    fixtures: &Path,
    xcconfig: &Path,
    project_dir: &str,
) -> Result<StagedFixture, CommandError> {
    let root = scratch.join(Uuid::new_v4().to_string());
    let fixture_dest = root.join("Fixtures");

    copy_tree(fixtures, &fixture_dest)?;
    fs::copy(xcconfig, root.join("Config.xcconfig")).map_err(|e| {
        CommandError::io(format!("Failed to copy {}", xcconfig.display()), e)
    })?;

    let build_dir = fixture_dest.join(project_dir);
    info!(root = %root.display(), "Staged build fixture (left in place after the run)");
    Ok(StagedFixture { root, build_dir })
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), CommandError> {
    if !from.is_dir() {
        return Err(CommandError::io(
            format!("Fixture directory {} not found", from.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let context = format!("Failed to walk {}", from.display());
            CommandError::io(context, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        let copied = if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        copied.map_err(|e| CommandError::io(format!("Failed to copy to {}", target.display()), e))?;
    }
    Ok(())
}
