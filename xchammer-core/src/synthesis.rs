//! Default [`SynthesisEngine`]: resolves the configured targets through Bazel and writes
//! one project description per configured project.
//!
//! For each project `<Name>` the engine writes into `<workspace_root>/<Name>.xcodeproj`:
//! - `XCHammerAssets/project.json`: the targets and settings of the project
//! - `XCHammerAssets/genStatus`: digest of the inputs the project was generated from
//!
//! A project whose `genStatus` matches the current inputs is left untouched unless the run
//! is forced. Output never depends on wall-clock time or hash-map ordering, so two forced
//! runs over the same inputs write identical files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::{HammerConfig, ProjectConfig, TargetConfig};
use crate::contract::{
    GeneratedProject, ProjectStatus, SynthesisEngine, SynthesisReport, SynthesisRequest,
};
use crate::error::BoxError;

const ASSETS_DIR: &str = "XCHammerAssets";
const GEN_STATUS_FILE: &str = "genStatus";
const PROJECT_FILE: &str = "project.json";
const WORKSPACE_CONTENTS: &str = "contents.xcworkspacedata";

#[derive(Debug, Default, Clone, Copy)]
pub struct BazelSynthesizer;

impl BazelSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Serialize)]
struct ProjectManifest<'a> {
    name: &'a str,
    generator_version: &'a str,
    workspace_root: &'a Path,
    bazel_path: &'a Path,
    config_path: &'a Path,
    paths: Vec<String>,
    targets: Vec<ManifestTarget<'a>>,
    generate_transitive_xcode_targets: bool,
    generate_xcode_schemes: bool,
    xcconfig_overrides: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ManifestTarget<'a> {
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a TargetConfig>,
}

#[async_trait]
impl SynthesisEngine for BazelSynthesizer {
    async fn synthesize<'a>(
        &self,
        req: SynthesisRequest<'a>,
    ) -> Result<SynthesisReport, BoxError> {
        let labels = query_labels(req.bazel_path, req.workspace_root, &req.config.targets).await?;
        info!(labels = labels.len(), "Resolved target labels through bazel query");

        let config_bytes = fs::read(req.config_path)
            .with_context(|| format!("Failed to read {}", req.config_path.display()))?;

        let mut projects = Vec::new();
        for (name, project) in &req.config.projects {
            let project_labels = labels_for_project(&labels, project)?;
            let digest = input_digest(&config_bytes, req.bazel_path, name, &project_labels);
            let project_dir = req.workspace_root.join(format!("{name}.xcodeproj"));
            let assets_dir = project_dir.join(ASSETS_DIR);
            let status_path = assets_dir.join(GEN_STATUS_FILE);

            if !req.force && is_fresh(&status_path, &digest) {
                info!(project = %name, "Project is up to date, skipping");
                projects.push(GeneratedProject {
                    name: name.clone(),
                    path: project_dir,
                    status: ProjectStatus::UpToDate,
                });
                continue;
            }

            let manifest = ProjectManifest {
                name,
                generator_version: crate::BINARY_VERSION,
                workspace_root: req.workspace_root,
                bazel_path: req.bazel_path,
                config_path: req.config_path,
                paths: project.path_patterns(),
                targets: project_labels
                    .iter()
                    .map(|label| ManifestTarget {
                        label,
                        config: req.config.target_config.get(label.as_str()),
                    })
                    .collect(),
                generate_transitive_xcode_targets: project.generate_transitive_xcode_targets,
                generate_xcode_schemes: project.generate_xcode_schemes,
                xcconfig_overrides: &project.xcconfig_overrides,
            };
            let json = serde_json::to_string_pretty(&manifest)?;

            fs::create_dir_all(&assets_dir)
                .with_context(|| format!("Failed to create {}", assets_dir.display()))?;
            fs::write(assets_dir.join(PROJECT_FILE), json + "\n")
                .with_context(|| format!("Failed to write project for {name}"))?;
            fs::write(&status_path, &digest)
                .with_context(|| format!("Failed to write {}", status_path.display()))?;
            info!(project = %name, path = %project_dir.display(), "Generated project");

            projects.push(GeneratedProject {
                name: name.clone(),
                path: project_dir,
                status: ProjectStatus::Generated,
            });
        }

        if let Some(workspace) = req.xcworkspace_path {
            write_workspace(workspace, &projects)?;
        }

        Ok(SynthesisReport {
            projects,
            xcworkspace_path: req.xcworkspace_path.map(Path::to_path_buf),
        })
    }
}

/// Runs `bazel query 'set(<targets>)' --output=label` in the workspace root.
async fn query_labels(
    bazel: &Path,
    workspace_root: &Path,
    targets: &[String],
) -> anyhow::Result<Vec<String>> {
    if targets.is_empty() {
        return Ok(Vec::new());
    }
    let expression = format!("set({})", targets.join(" "));
    debug!(bazel = %bazel.display(), %expression, "Running bazel query");

    let output = Command::new(bazel)
        .arg("query")
        .arg(&expression)
        .arg("--output=label")
        .current_dir(workspace_root)
        .output()
        .await
        .with_context(|| format!("Failed to launch {}", bazel.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(status = ?output.status, stderr = %stderr, "bazel query failed");
        bail!("bazel query exited with {}: {}", output.status, stderr.trim());
    }

    let labels = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(labels)
}

/// Package directory of a label: `//a/b:c` and `@repo//a/b:c` give `a/b`.
pub fn label_package(label: &str) -> &str {
    let without_repo = match label.find("//") {
        Some(idx) => &label[idx + 2..],
        None => label,
    };
    match without_repo.find(':') {
        Some(idx) => &without_repo[..idx],
        None => without_repo,
    }
}

/// Labels whose `<package>/BUILD` path matches one of the project's path globs,
/// in query order.
pub fn labels_for_project(
    labels: &[String],
    project: &ProjectConfig,
) -> anyhow::Result<Vec<String>> {
    let patterns = project
        .path_patterns()
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid path glob {p:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(labels
        .iter()
        .filter(|label| {
            let package = label_package(label);
            let build_file = if package.is_empty() {
                "BUILD".to_string()
            } else {
                format!("{package}/BUILD")
            };
            patterns.iter().any(|p| p.matches(&build_file))
        })
        .cloned()
        .collect())
}

fn input_digest(config_bytes: &[u8], bazel: &Path, name: &str, labels: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(crate::BINARY_VERSION.as_bytes());
    hasher.update([0]);
    hasher.update(config_bytes);
    hasher.update([0]);
    hasher.update(bazel.to_string_lossy().as_bytes());
    hasher.update([0]);
    hasher.update(name.as_bytes());
    for label in labels {
        hasher.update([0]);
        hasher.update(label.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn is_fresh(status_path: &Path, digest: &str) -> bool {
    match fs::read_to_string(status_path) {
        Ok(existing) => existing.trim() == digest,
        Err(_) => false,
    }
}

/// Writes `contents.xcworkspacedata`, keeping the file references already present.
fn write_workspace(workspace: &Path, projects: &[GeneratedProject]) -> anyhow::Result<()> {
    let contents_path = workspace.join(WORKSPACE_CONTENTS);
    let mut locations = BTreeSet::new();

    if let Ok(existing) = fs::read_to_string(&contents_path) {
        let re = Regex::new(r#"location\s*=\s*"([^"]+)""#)?;
        for cap in re.captures_iter(&existing) {
            locations.insert(xml_unescape(&cap[1]));
        }
    }
    for project in projects {
        locations.insert(format!("absolute:{}", project.path.display()));
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Workspace\n   version = \"1.0\">\n",
    );
    for location in &locations {
        xml.push_str(&format!(
            "   <FileRef\n      location = \"{}\">\n   </FileRef>\n",
            xml_escape(location)
        ));
    }
    xml.push_str("</Workspace>\n");

    fs::create_dir_all(workspace)
        .with_context(|| format!("Failed to create {}", workspace.display()))?;
    fs::write(&contents_path, xml)
        .with_context(|| format!("Failed to write {}", contents_path.display()))?;
    info!(
        workspace = %workspace.display(),
        refs = locations.len(),
        "Wrote xcworkspace contents"
    );
    Ok(())
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Where [`BazelSynthesizer`] writes the project description for `name`.
pub fn project_manifest_path(workspace_root: &Path, name: &str) -> PathBuf {
    workspace_root
        .join(format!("{name}.xcodeproj"))
        .join(ASSETS_DIR)
        .join(PROJECT_FILE)
}
