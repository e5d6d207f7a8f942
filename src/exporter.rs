//! `xcconfig-exporter`: builds a fixture iOS app with a user supplied xcconfig and prints
//! the diagnostic flags Xcode passed to the compiler as a Starlark list.
//!
//! ```text
//! xcconfig-exporter path/to/Config.xcconfig > diag_flags.bzl
//! xcconfig-exporter --transcript build.log > diag_flags.bzl
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use xchammer_core::flags::{extract_flags, flags_from_transcript, render_bzl, stage_fixture};
use xchammer_core::CommandError;

use crate::cli::report_error;

pub const DEFAULT_BUILD_COMMAND: &str =
    "xcodebuild -project iOSApp.xcodeproj -scheme iOSApp -sdk iphonesimulator -configuration Debug";

pub const DEFAULT_PROJECT_DIR: &str = "iOSApp";

const USAGE: &str = "usage: /path/to/xcconfig";

#[derive(Parser, Debug)]
#[clap(
    name = "xcconfig-exporter",
    version,
    about = "Export the diagnostic flags Xcode passes to the compiler for an xcconfig"
)]
pub struct ExporterCli {
    /// Path to the xcconfig to build with
    pub xcconfig: Option<PathBuf>,

    /// Directory holding the fixture projects (defaults to `Fixtures` next to the binary)
    #[clap(long, env = "XCHAMMER_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Fixture subdirectory the build runs in
    #[clap(long, default_value = DEFAULT_PROJECT_DIR)]
    pub project_dir: String,

    /// Build command, run through bash with stderr folded into stdout
    #[clap(long, default_value = DEFAULT_BUILD_COMMAND)]
    pub build_command: String,

    /// Read an existing build log instead of building
    #[clap(long, conflicts_with = "xcconfig")]
    pub transcript: Option<PathBuf>,
}

/// Produces the rendered flag list, or `None` when there is nothing to do.
pub async fn run(cli: ExporterCli) -> Result<Option<String>, CommandError> {
    let flags = if let Some(transcript) = &cli.transcript {
        let log = std::fs::read_to_string(transcript).map_err(|e| {
            CommandError::io(format!("Failed to read {}", transcript.display()), e)
        })?;
        flags_from_transcript(&log)?
    } else if let Some(xcconfig) = &cli.xcconfig {
        let fixtures = match &cli.fixtures {
            Some(dir) => dir.clone(),
            None => default_fixtures()?,
        };
        let staged = stage_fixture(&std::env::temp_dir(), &fixtures, xcconfig, &cli.project_dir)?;
        extract_flags(&cli.build_command, &staged.build_dir).await?
    } else {
        return Ok(None);
    };
    Ok(Some(render_bzl(&flags)))
}

fn default_fixtures() -> Result<PathBuf, CommandError> {
    let exe = std::env::current_exe()
        .map_err(|e| CommandError::io("Failed to locate the running executable", e))?;
    let dir = exe.parent().unwrap_or(Path::new("."));
    Ok(dir.join("Fixtures"))
}

/// Entry point shared by the binary and tests.
pub async fn dispatch(cli: ExporterCli) -> ExitCode {
    match run(cli).await {
        Ok(Some(rendered)) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("{USAGE}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}
