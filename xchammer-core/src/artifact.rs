//! Post-build artifact processing.
//!
//! Bazel produces an `.ipa`, while Xcode expects the unpacked `.app` at
//! `$CODESIGNING_FOLDER_PATH`. [`process_artifact`] validates the environment Xcode runs
//! the step in and hands the two locations to an [`ArtifactPackager`]; [`IpaPackager`] is
//! the packager used by the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::{ArtifactPackager, ArtifactPaths};
use crate::error::{BoxError, CommandError};

pub const BUILT_PRODUCTS_DIR: &str = "BUILT_PRODUCTS_DIR";
pub const CODESIGNING_FOLDER_PATH: &str = "CODESIGNING_FOLDER_PATH";

impl ArtifactPaths {
    /// Reads both variables through `lookup`, checking `BUILT_PRODUCTS_DIR` first.
    /// Unset and empty values are both reported as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CommandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<PathBuf, CommandError> {
            match lookup(name) {
                Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
                _ => {
                    error!(var = name, "Required environment variable missing");
                    Err(CommandError::MissingEnvVars(name.to_string()))
                }
            }
        };
        let built_products_dir = require(BUILT_PRODUCTS_DIR)?;
        let codesigning_folder_path = require(CODESIGNING_FOLDER_PATH)?;
        Ok(Self {
            built_products_dir,
            codesigning_folder_path,
        })
    }

    /// Reads both variables from the process environment.
    pub fn from_env() -> Result<Self, CommandError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

pub async fn process_artifact<P>(paths: &ArtifactPaths, packager: &P) -> Result<(), CommandError>
where
    P: ArtifactPackager + ?Sized,
{
    info!(
        built_products_dir = %paths.built_products_dir.display(),
        codesigning_folder_path = %paths.codesigning_folder_path.display(),
        "[ARTIFACT] Processing build artifact"
    );
    packager.package(paths).await.map_err(|e| {
        error!(error = %e, "[ARTIFACT][ERROR] Packaging failed");
        CommandError::PackagingException(e)
    })
}

/// Unpacks `Payload/<App>.app` of the first `.ipa` in the built products directory into
/// the codesigning folder, replacing whatever was there.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpaPackager;

#[async_trait]
impl ArtifactPackager for IpaPackager {
    async fn package(&self, paths: &ArtifactPaths) -> Result<(), BoxError> {
        let ipa = find_ipa(&paths.built_products_dir)?;
        info!(ipa = %ipa.display(), "Found ipa");
        let extracted = extract_app(&ipa, &paths.codesigning_folder_path)?;
        info!(
            files = extracted,
            dest = %paths.codesigning_folder_path.display(),
            "Extracted app payload"
        );
        Ok(())
    }
}

fn find_ipa(dir: &Path) -> anyhow::Result<PathBuf> {
    let pattern = dir.join("*.ipa");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow!("Non UTF-8 path {}", dir.display()))?;
    let mut ipas = glob::glob(pattern)?
        .filter_map(Result::ok)
        .collect::<Vec<_>>();
    ipas.sort();
    if ipas.len() > 1 {
        warn!(count = ipas.len(), "Several ipas found, using the first");
    }
    ipas.into_iter()
        .next()
        .ok_or_else(|| anyhow!("No .ipa found in {}", dir.display()))
}

/// Returns the number of files written. `dest` is only replaced once the payload has been
/// fully extracted next to it.
fn extract_app(ipa: &Path, dest: &Path) -> anyhow::Result<usize> {
    let file = fs::File::open(ipa).with_context(|| format!("Failed to open {}", ipa.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Invalid ipa archive {}", ipa.display()))?;

    let has_app = archive
        .file_names()
        .any(|name| payload_relative(Path::new(name)).is_some());
    if !has_app {
        return Err(anyhow!("{} has no Payload/*.app", ipa.display()));
    }

    let staging = staging_dir(dest)?;
    let written = match unpack_payload(&mut archive, &staging) {
        Ok(written) => written,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    if dest.exists() {
        fs::remove_dir_all(dest)
            .with_context(|| format!("Failed to remove {}", dest.display()))?;
    }
    fs::rename(&staging, dest).with_context(|| {
        format!("Failed to move {} to {}", staging.display(), dest.display())
    })?;
    Ok(written)
}

/// A fresh directory beside `dest`, on the same filesystem so it can be renamed over it.
fn staging_dir(dest: &Path) -> anyhow::Result<PathBuf> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    let staging = parent.join(format!(".{name}.{}", Uuid::new_v4()));
    fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;
    Ok(staging)
}

fn unpack_payload(archive: &mut zip::ZipArchive<fs::File>, into: &Path) -> anyhow::Result<usize> {
    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(anyhow!("Unsafe path in ipa: {}", entry.name()));
        };
        let Some(relative) = payload_relative(&name) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = into.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        std::io::copy(&mut entry, &mut out)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        }
        written += 1;
    }
    Ok(written)
}

/// `Payload/Foo.app/Info.plist` → `Info.plist`; entries outside an app bundle → `None`.
fn payload_relative(name: &Path) -> Option<PathBuf> {
    let mut components = name.components();
    if components.next()?.as_os_str() != "Payload" {
        return None;
    }
    let bundle = components.next()?;
    if !bundle.as_os_str().to_string_lossy().ends_with(".app") {
        return None;
    }
    Some(components.as_path().to_path_buf())
}
