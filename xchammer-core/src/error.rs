//! Error types shared by every xchammer command.
//!
//! Two classes of failure exist:
//! - [`CommandError`]: recoverable. Handlers return it and the CLI reports it as an
//!   error block on stderr with a non-zero exit code.
//! - [`FatalError`]: the execution environment itself is unusable (no toolchain, no
//!   working directory). It is never folded into a `CommandError`; the caller ends the
//!   process through [`FatalError::terminate`].

use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when a [`FatalError`] terminates the process (EX_SOFTWARE).
pub const FATAL_EXIT_CODE: i32 = 70;

/// Boxed error type used at the capability-trait seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a single command handler: success, or a reportable failure.
pub type CommandOutcome = Result<(), CommandError>;

/// Recoverable failures, reported at the command-handler boundary.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A file or directory could not be read or written.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not a valid XCHammer config.
    #[error("Failed to decode config {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required environment variable is absent or empty.
    #[error("${0} not found in the env")]
    MissingEnvVars(String),

    /// The project synthesis engine failed.
    #[error("Project synthesis failed")]
    SynthesisException(#[source] BoxError),

    /// The artifact packager failed.
    #[error("Artifact packaging failed")]
    PackagingException(#[source] BoxError),

    /// A child process could not be started.
    #[error("Failed to run `{command}`")]
    Shell {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// No compiler invocation in the transcript carried a diagnostic flag.
    #[error("Missing flags: no compiler invocation with diagnostic flags found in the build log")]
    MissingFlags,
}

impl CommandError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CommandError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable identifier printed in the error block.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Io { .. } => "io",
            CommandError::Decode { .. } => "decode",
            CommandError::MissingEnvVars(_) => "missingEnvVars",
            CommandError::SynthesisException(_) => "synthesisException",
            CommandError::PackagingException(_) => "packagingException",
            CommandError::Shell { .. } => "shell",
            CommandError::MissingFlags => "missingFlags",
        }
    }

    /// The underlying cause, rendered for humans, when there is one.
    pub fn detail(&self) -> Option<String> {
        let mut source = std::error::Error::source(self);
        let mut chain = Vec::new();
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        if chain.is_empty() {
            None
        } else {
            Some(chain.join(": "))
        }
    }
}

/// Unrecoverable environment failures. No command can proceed past one of these.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("Missing {tool}: not found on the executable search path ({source})")]
    ToolchainMissing {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("Cannot determine the current working directory: {0}")]
    WorkingDirectoryUnavailable(#[source] std::io::Error),
}

impl FatalError {
    /// Prints the diagnostic and ends the process with [`FATAL_EXIT_CODE`].
    pub fn terminate(self) -> ! {
        tracing::error!(error = %self, "fatal error, terminating");
        eprintln!("fatal error: {self}");
        std::process::exit(FATAL_EXIT_CODE)
    }
}
