//! Project generation: hands resolved options and the loaded config to a
//! [`SynthesisEngine`] and translates the outcome.
//!
//! This step adds no behavior of its own. Engine failures become
//! [`CommandError::SynthesisException`] so they stay distinguishable from path and config
//! failures, which are raised before this point.

use tracing::{error, info};

use crate::config::HammerConfig;
use crate::contract::{SynthesisEngine, SynthesisReport, SynthesisRequest};
use crate::error::CommandError;
use crate::paths::ResolvedOptions;

pub async fn generate<E>(
    options: &ResolvedOptions,
    config: &HammerConfig,
    engine: &E,
) -> Result<SynthesisReport, CommandError>
where
    E: SynthesisEngine + ?Sized,
{
    info!(
        workspace_root = %options.workspace_root.display(),
        projects = config.projects.len(),
        force = options.force,
        "[GENERATE] Invoking synthesis engine"
    );

    let req = SynthesisRequest {
        workspace_root: &options.workspace_root,
        bazel_path: &options.bazel_path,
        config_path: &options.config_path,
        config,
        xcworkspace_path: options.xcworkspace_path.as_deref(),
        force: options.force,
    };

    match engine.synthesize(req).await {
        Ok(report) => {
            for project in &report.projects {
                info!(
                    project = %project.name,
                    path = %project.path.display(),
                    status = ?project.status,
                    "[GENERATE] Project synthesized"
                );
            }
            Ok(report)
        }
        Err(e) => {
            error!(error = %e, "[GENERATE][ERROR] Synthesis engine failed");
            Err(CommandError::SynthesisException(e))
        }
    }
}
