//! This module implements the CLI interface for xchammer: command parsing, verb routing,
//! handler invocation and the uniform error report.
//!
//! All business logic (path resolution, generation, artifact processing) lives in the
//! [`xchammer-core`] crate. This module is strictly CLI glue.
//!
//! ## Routing
//! - The verb table is the [`Commands`] enum plus clap's built-in `help`, fixed at compile
//!   time and never modified.
//! - No verb, or a verb that is not in the table, prints the help and exits 0.
//! - Option errors inside a known verb are usage errors (exit 2).
//! - A handler failure prints an error block on stderr and exits 1.
//!
//! ## How To Use
//! - Command-line users: `xchammer --help`.
//! - Programmatic/integration use: call [`dispatch`] with an argument vector, or [`run`]
//!   with a constructed [`Cli`].
//!
//! [`xchammer-core`]: ../../xchammer_core/
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use xchammer_core::artifact::{process_artifact, IpaPackager};
use xchammer_core::contract::ArtifactPaths;
use xchammer_core::generate::generate;
use xchammer_core::paths::{GenerateOptions, SearchPathLocator};
use xchammer_core::synthesis::BazelSynthesizer;
use xchammer_core::{CommandError, CommandOutcome, BINARY_VERSION};

use crate::load_config::load_config;

/// CLI for xchammer: generate Xcode projects for a Bazel workspace.
#[derive(Parser, Debug)]
#[clap(
    name = "xchammer",
    version,
    about = "Generate Xcode projects from a Bazel workspace"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an Xcode project
    Generate {
        /// Path to the XCHammerConfig yaml file
        config: PathBuf,

        /// The source root of the repo
        #[clap(long = "workspace_root")]
        workspace_root: Option<PathBuf>,

        /// Path to the bazel binary
        #[clap(long)]
        bazel: Option<PathBuf>,

        /// Force run the generator
        #[clap(long)]
        force: bool,

        /// Path to the xcworkspace
        #[clap(long)]
        xcworkspace: Option<PathBuf>,
    },

    /// Process the IPA after a build; expects Xcode's build environment variables
    #[clap(name = "process-artifact", alias = "process-ipa")]
    ProcessArtifact,

    /// Print the current version
    Version,
}

/// Parses `args` (program name first), routes to a handler and returns the exit code.
pub async fn dispatch<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    // `help` takes the verb to describe as its argument
    let requested = match args.get(1).and_then(|a| a.to_str()) {
        Some("help") => args.get(2).and_then(|a| a.to_str()),
        other => other,
    };
    if let Some(verb) = requested {
        if !verb.starts_with('-') && !is_registered_verb(verb) {
            tracing::warn!(verb, "Unknown command, showing help");
            eprintln!("Unrecognized command: '{verb}'. See the available commands below.");
            print_help();
            return ExitCode::SUCCESS;
        }
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            // help/version displays exit 0, usage errors exit 2
            let code = e.exit_code();
            let _ = e.print();
            return ExitCode::from(code as u8);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn is_registered_verb(verb: &str) -> bool {
    verb == "help" || Cli::command().find_subcommand(verb).is_some()
}

fn print_help() {
    let _ = Cli::command().print_help();
    println!();
}

/// Runs the handler for the parsed command.
pub async fn run(cli: Cli) -> CommandOutcome {
    tracing::debug!(command = ?cli.command, "Dispatching command");

    match cli.command {
        None => {
            print_help();
            Ok(())
        }
        Some(Commands::Generate {
            config,
            workspace_root,
            bazel,
            force,
            xcworkspace,
        }) => {
            let options = GenerateOptions::new(config)
                .workspace_root(workspace_root)
                .bazel(bazel)
                .force(force)
                .xcworkspace(xcworkspace)
                .resolve(&SearchPathLocator::from_env())
                .unwrap_or_else(|fatal| fatal.terminate());

            let config = load_config(&options.config_path)?;
            tracing::info!(command = "generate", "Starting project generation");
            let report = generate(&options, &config, &BazelSynthesizer::new()).await?;
            tracing::info!(command = "generate", ?report, "Project generation complete");
            Ok(())
        }
        Some(Commands::ProcessArtifact) => {
            let paths = ArtifactPaths::from_env()?;
            process_artifact(&paths, &IpaPackager).await
        }
        Some(Commands::Version) => {
            println!("{BINARY_VERSION}");
            Ok(())
        }
    }
}

/// Writes the error block for a failed command.
pub fn write_error_block<W: Write>(out: &mut W, error: &CommandError) -> std::io::Result<()> {
    writeln!(out, "------")?;
    writeln!(out, "--- EXCEPTION ---")?;
    writeln!(out, "kind: {}", error.kind())?;
    writeln!(out, "message: {error}")?;
    if let Some(detail) = error.detail() {
        writeln!(out, "detail: {detail}")?;
    }
    writeln!(out, "------")
}

/// Logs the failure and prints the error block to stderr.
pub fn report_error(error: &CommandError) {
    tracing::error!(kind = error.kind(), error = %error, "Command failed");
    let _ = write_error_block(&mut std::io::stderr().lock(), error);
}
