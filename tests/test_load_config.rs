use std::fs::write;

use tempfile::NamedTempFile;
use xchammer::load_config::{load_config, load_config_with};
use xchammer_core::config::HammerConfig;
use xchammer_core::contract::ConfigDecoder;
use xchammer_core::CommandError;

fn config_file(contents: &[u8]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), contents).unwrap();
    file
}

/// A complete config decodes into targets, per-target settings and projects.
#[test]
fn test_load_config_success() {
    let config_yaml = r#"
targets:
  - //ios-app:ios-app
  - //ios-app:ios-app-tests
target_config:
  "//ios-app:ios-app":
    xcconfig: ios-app/Config.xcconfig
    build_bazel_options: "--config=ios_x86_64"
    xcconfig_overrides:
      SWIFT_VERSION: "5.0"
projects:
  App:
    paths:
      - "ios-app/**"
    generate_xcode_schemes: false
"#;
    let file = config_file(config_yaml.as_bytes());

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.targets, vec!["//ios-app:ios-app", "//ios-app:ios-app-tests"]);
    let target = &config.target_config["//ios-app:ios-app"];
    assert_eq!(target.xcconfig.as_deref(), Some("ios-app/Config.xcconfig"));
    assert_eq!(target.build_bazel_options.as_deref(), Some("--config=ios_x86_64"));
    assert_eq!(target.xcconfig_overrides["SWIFT_VERSION"], "5.0");

    let app = &config.projects["App"];
    assert_eq!(app.paths, Some(vec!["ios-app/**".to_string()]));
    assert!(!app.generate_xcode_schemes);
    assert!(app.generate_transitive_xcode_targets);
}

/// Optional sections fall back to their defaults.
#[test]
fn test_load_config_applies_defaults() {
    let file = config_file(b"targets: [\"//a:a\"]\nprojects:\n  A: {}\n");

    let config = load_config(file.path()).unwrap();
    assert!(config.target_config.is_empty());
    let project = &config.projects["A"];
    assert_eq!(project.paths, None);
    assert_eq!(project.path_patterns(), vec!["**".to_string()]);
    assert!(project.generate_transitive_xcode_targets);
    assert!(project.generate_xcode_schemes);
}

/// Text that is not YAML is a decode error naming the file.
#[test]
fn test_load_config_errors_for_invalid_yaml() {
    let file = config_file(b"targets: [:::");

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, CommandError::Decode { .. }), "got: {err:?}");
    assert_eq!(err.kind(), "decode");
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

/// Schema mismatches keep the offending key in the error detail.
#[test]
fn test_load_config_reports_mismatched_keys() {
    let file = config_file(b"targets: [\"//a:a\"]\nprojects: 42\n");

    let err = load_config(file.path()).unwrap_err();
    assert_eq!(err.kind(), "decode");
    let detail = err.detail().expect("decode errors carry a detail");
    assert!(detail.contains("projects"), "detail should name the key: {detail}");

    let file = config_file(b"projects: {}\n");
    let detail = load_config(file.path()).unwrap_err().detail().unwrap();
    assert!(detail.contains("targets"), "missing key should be named: {detail}");
}

/// A missing file is an io error.
#[test]
fn test_load_config_errors_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(dir.path().join("absent.yml")).unwrap_err();
    assert_eq!(err.kind(), "io");
    assert!(err.to_string().contains("absent.yml"));
}

/// Bytes that are not UTF-8 cannot be read as config text.
#[test]
fn test_load_config_errors_for_non_utf8() {
    let file = config_file(&[0xff, 0xfe, 0x00, 0x74]);
    assert_eq!(load_config(file.path()).unwrap_err().kind(), "io");
}

struct FixedDecoder(HammerConfig);

impl ConfigDecoder for FixedDecoder {
    fn decode(&self, text: &str) -> Result<HammerConfig, serde_yaml::Error> {
        assert_eq!(text, "anything");
        Ok(self.0.clone())
    }
}

/// The decoder is pluggable; the loader only supplies the file text.
#[test]
fn test_load_config_with_custom_decoder() {
    let file = config_file(b"anything");
    let expected = HammerConfig {
        targets: vec!["//x:x".to_string()],
        target_config: Default::default(),
        projects: Default::default(),
    };

    let config = load_config_with(file.path(), &FixedDecoder(expected.clone())).unwrap();
    assert_eq!(config, expected);
}
