//! `load_config` module: reads an XCHammer YAML config file into a [`HammerConfig`].
//!
//! This is the only place where the user-supplied config text is read and decoded.
//!
//! # Errors
//! - [`CommandError::Io`]: the file is missing, unreadable or not UTF-8.
//! - [`CommandError::Decode`]: the text does not match the config schema. The message of
//!   the underlying `serde_yaml` error names the offending key path and location.
//!
//! Nothing is cached: each call reads the file again.
use std::fs;
use std::path::Path;

use tracing::{error, info};
use xchammer_core::config::HammerConfig;
use xchammer_core::contract::{ConfigDecoder, YamlDecoder};
use xchammer_core::CommandError;

/// Loads the config at `path` with the YAML decoder.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HammerConfig, CommandError> {
    load_config_with(path, &YamlDecoder)
}

/// Loads the config at `path` with an arbitrary decoder.
pub fn load_config_with<P, D>(path: P, decoder: &D) -> Result<HammerConfig, CommandError>
where
    P: AsRef<Path>,
    D: ConfigDecoder + ?Sized,
{
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(CommandError::io(
                format!("Failed to read config file {}", path_ref.display()),
                e,
            ));
        }
    };

    let config = match decoder.decode(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = %e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(CommandError::Decode {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    config.trace_loaded();
    Ok(config)
}
