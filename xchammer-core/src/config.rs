use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The XCHammer configuration file: which Bazel targets to expose and how to group them
/// into Xcode projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HammerConfig {
    /// Bazel labels to generate Xcode targets for.
    pub targets: Vec<String>,

    /// Per-label overrides, keyed by Bazel label.
    #[serde(default)]
    pub target_config: BTreeMap<String, TargetConfig>,

    /// Projects to generate, keyed by project name.
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl HammerConfig {
    pub fn trace_loaded(&self) {
        info!(
            targets_count = self.targets.len(),
            projects_count = self.projects.len(),
            "Loaded HammerConfig"
        );
        debug!(?self, "HammerConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub xcconfig: Option<String>,
    #[serde(default)]
    pub build_bazel_options: Option<String>,
    #[serde(default)]
    pub build_bazel_template: Option<String>,
    #[serde(default)]
    pub xcconfig_overrides: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Globs over source paths; a target is part of the project when its package matches.
    /// Absent means every package.
    #[serde(default)]
    pub paths: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub generate_transitive_xcode_targets: bool,
    #[serde(default = "default_true")]
    pub generate_xcode_schemes: bool,
    #[serde(default)]
    pub xcconfig_overrides: BTreeMap<String, String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            paths: None,
            generate_transitive_xcode_targets: true,
            generate_xcode_schemes: true,
            xcconfig_overrides: BTreeMap::new(),
        }
    }
}

impl ProjectConfig {
    pub fn path_patterns(&self) -> Vec<String> {
        match &self.paths {
            Some(paths) => paths.clone(),
            None => vec!["**".to_string()],
        }
    }
}

fn default_true() -> bool {
    true
}
