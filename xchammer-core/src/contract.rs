//! # contract: capability interfaces used by the xchammer commands
//!
//! The commands never talk to Bazel, the config format or the packaging tools directly.
//! They go through the traits defined here:
//! - [`ConfigDecoder`]: turns config text into a [`HammerConfig`].
//! - [`SynthesisEngine`]: builds Xcode projects from the resolved inputs.
//! - [`ArtifactPackager`]: turns build products into what Xcode expects after a build.
//!
//! Concrete implementations live in [`crate::synthesis`] and [`crate::artifact`].
//!
//! ## Mocking & Testing
//! The async traits are annotated for `mockall`; with the default `test-export-mocks`
//! feature the mocks are exported for use by dependent crates' tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::HammerConfig;
use crate::error::BoxError;

/// Decodes configuration text. `serde_yaml::Error` carries the offending key path and
/// location, which the CLI surfaces as a decode error.
pub trait ConfigDecoder {
    fn decode(&self, text: &str) -> Result<HammerConfig, serde_yaml::Error>;
}

/// YAML decoder for [`HammerConfig`].
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlDecoder;

impl ConfigDecoder for YamlDecoder {
    fn decode(&self, text: &str) -> Result<HammerConfig, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

/// Everything the synthesis engine needs for one generation run.
pub struct SynthesisRequest<'a> {
    pub workspace_root: &'a Path,
    pub bazel_path: &'a Path,
    pub config_path: &'a Path,
    pub config: &'a HammerConfig,
    /// Existing workspace to merge the generated projects into.
    pub xcworkspace_path: Option<&'a Path>,
    /// Skip the engine's freshness check.
    pub force: bool,
}

/// Whether a project was (re)written or left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Generated,
    UpToDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProject {
    pub name: String,
    pub path: PathBuf,
    pub status: ProjectStatus,
}

/// What a synthesis run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    pub projects: Vec<GeneratedProject>,
    pub xcworkspace_path: Option<PathBuf>,
}

/// Builds IDE projects from a workspace description.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    async fn synthesize<'a>(&self, req: SynthesisRequest<'a>)
        -> Result<SynthesisReport, BoxError>;
}

/// The two locations Xcode hands to the post-build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub built_products_dir: PathBuf,
    pub codesigning_folder_path: PathBuf,
}

/// Performs the post-build packaging step.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArtifactPackager: Send + Sync {
    async fn package(&self, paths: &ArtifactPaths) -> Result<(), BoxError>;
}
