#![doc = "xchammer-core: core logic library for xchammer."]

//! This crate holds everything the `xchammer` binaries do apart from argument parsing:
//! path resolution, the config schema, project generation, post-build artifact
//! processing and diagnostic flag extraction from build logs.
//!
//! External systems (Bazel, the project synthesis engine, the packager) sit behind the
//! traits in [`contract`] so the pipelines can run against mocks.

pub mod artifact;
pub mod build_log;
pub mod config;
pub mod contract;
pub mod error;
pub mod flags;
pub mod generate;
pub mod paths;
pub mod synthesis;

pub use error::{CommandError, CommandOutcome, FatalError};

/// Version reported by `xchammer version` and recorded in generated projects.
pub const BINARY_VERSION: &str = env!("CARGO_PKG_VERSION");
