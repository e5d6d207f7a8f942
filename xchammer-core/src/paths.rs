//! Path resolution for the `generate` command.
//!
//! [`GenerateOptions`] collects what the user passed on the command line. A single call to
//! [`GenerateOptions::resolve`] turns it into [`ResolvedOptions`]: every path absolute and
//! lexically normalized, the workspace root defaulted to the working directory and the
//! Bazel binary discovered on the search path when not given explicitly.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::{debug, info};

use crate::error::FatalError;

/// Name of the toolchain binary looked up on the search path.
pub const DEFAULT_TOOLCHAIN_BINARY: &str = "bazel";

/// Makes `path` absolute against `cwd` and removes `.` and `..` segments.
///
/// A leading `~` expands to the home directory. `..` never climbs above the root.
/// The result is stable: normalizing it again returns the same path.
pub fn normalize(path: &Path, cwd: &Path) -> PathBuf {
    let expanded = expand_home(path);
    let anchored = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut out = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // pop() refuses to remove the root
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Finds executables on a search path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ToolchainLocator {
    fn locate(&self, binary: &str, cwd: &Path) -> Result<PathBuf, which::Error>;
}

/// `which`-style lookup over `PATH`, or over an explicit list of directories.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    search_path: Option<OsString>,
}

impl SearchPathLocator {
    /// Looks up binaries on the process `PATH`.
    pub fn from_env() -> Self {
        Self { search_path: None }
    }

    /// Looks up binaries in `search_path` (a `PATH`-formatted list) instead of `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }
}

impl ToolchainLocator for SearchPathLocator {
    fn locate(&self, binary: &str, cwd: &Path) -> Result<PathBuf, which::Error> {
        match &self.search_path {
            Some(paths) => which::which_in(binary, Some(paths), cwd),
            None => which::which(binary),
        }
    }
}

/// Fully resolved inputs of the `generate` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub config_path: PathBuf,
    pub workspace_root: PathBuf,
    pub bazel_path: PathBuf,
    pub force: bool,
    pub xcworkspace_path: Option<PathBuf>,
}

/// Builder for [`ResolvedOptions`].
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    config_path: PathBuf,
    workspace_root: Option<PathBuf>,
    bazel_path: Option<PathBuf>,
    force: bool,
    xcworkspace_path: Option<PathBuf>,
}

impl GenerateOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            workspace_root: None,
            bazel_path: None,
            force: false,
            xcworkspace_path: None,
        }
    }

    pub fn workspace_root(mut self, path: Option<PathBuf>) -> Self {
        self.workspace_root = path;
        self
    }

    pub fn bazel(mut self, path: Option<PathBuf>) -> Self {
        self.bazel_path = path;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn xcworkspace(mut self, path: Option<PathBuf>) -> Self {
        self.xcworkspace_path = path;
        self
    }

    /// Resolves against the process working directory.
    pub fn resolve<L: ToolchainLocator + ?Sized>(
        self,
        locator: &L,
    ) -> Result<ResolvedOptions, FatalError> {
        let cwd = std::env::current_dir().map_err(FatalError::WorkingDirectoryUnavailable)?;
        self.resolve_in(&cwd, locator)
    }

    /// Resolves against an explicit working directory.
    pub fn resolve_in<L: ToolchainLocator + ?Sized>(
        self,
        cwd: &Path,
        locator: &L,
    ) -> Result<ResolvedOptions, FatalError> {
        let workspace_root = match &self.workspace_root {
            Some(root) => normalize(root, cwd),
            None => normalize(cwd, cwd),
        };

        let bazel_path = match &self.bazel_path {
            Some(explicit) => normalize(explicit, cwd),
            None => {
                let found = locator
                    .locate(DEFAULT_TOOLCHAIN_BINARY, cwd)
                    .map_err(|source| FatalError::ToolchainMissing {
                        tool: DEFAULT_TOOLCHAIN_BINARY.to_string(),
                        source,
                    })?;
                debug!(path = %found.display(), "Discovered bazel on the search path");
                normalize(&found, cwd)
            }
        };

        let resolved = ResolvedOptions {
            config_path: normalize(&self.config_path, cwd),
            workspace_root,
            bazel_path,
            force: self.force,
            xcworkspace_path: self.xcworkspace_path.as_deref().map(|p| normalize(p, cwd)),
        };
        info!(
            config = %resolved.config_path.display(),
            workspace_root = %resolved.workspace_root.display(),
            bazel = %resolved.bazel_path.display(),
            force = resolved.force,
            "Resolved generate options"
        );
        Ok(resolved)
    }
}
