//! Unit tests for configuration loading.

use crate::config::{ConfigError, EnvSource, SyncConfig};
use crate::tracker::services::{DEFAULT_MAX_CHILDREN, RateLimitPolicy};
use crate::workflow::domain::Phase;
use camino::Utf8PathBuf;
use rstest::rstest;
use std::collections::HashMap;
use std::time::Duration;

const MINIMAL: &str = r#"
[tracker]
owner = "acme"
repository = "checkout"
"#;

const FULL: &str = r#"
[tracker]
owner = "acme"
repository = "checkout"
api_base_url = "https://github.example.com/api/v3"
token_env = "ACME_TOKEN"
max_children = 25

[rate_limit]
max_retries = 5
initial_delay_ms = 250

[status]
project_id = "PVT_kwDOA"
fallback = "Backlog"
verify_retries = 2

[status.phase_map]
implementation = "Doing"
Testing = "QA"

[webhook]
secret_env = "ACME_HOOK_SECRET"

[logging]
filter = "specsync=debug"
"#;

#[derive(Default)]
struct MapEnv(HashMap<&'static str, &'static str>);

impl MapEnv {
    fn with(mut self, name: &'static str, value: &'static str) -> Self {
        self.0.insert(name, value);
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).map(|value| (*value).to_owned())
    }
}

#[rstest]
fn minimal_document_takes_defaults() {
    let config = SyncConfig::from_toml_str(MINIMAL).expect("valid config");

    assert_eq!(config.tracker.api_base_url, "https://api.github.com");
    assert_eq!(config.tracker.token_env, "GITHUB_TOKEN");
    assert_eq!(config.tracker.max_children, DEFAULT_MAX_CHILDREN);
    assert_eq!(config.rate_limit_policy(), RateLimitPolicy::default());
    assert_eq!(config.status.project_id, None);
    assert_eq!(config.webhook.secret_env, "SPECSYNC_WEBHOOK_SECRET");
    assert_eq!(config.logging.filter, "info");
    let settings = config.status_settings().expect("status settings");
    assert_eq!(settings.field_name, "Status");
    assert_eq!(settings.fallback, "Todo");
    assert_eq!(settings.verify_retries, 3);
    assert_eq!(settings.verify_initial_delay, Duration::from_secs(1));
}

#[rstest]
fn full_document_overrides_defaults() {
    let config = SyncConfig::from_toml_str(FULL).expect("valid config");

    assert_eq!(config.tracker.max_children, 25);
    assert_eq!(
        config.rate_limit_policy(),
        RateLimitPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(250),
        }
    );
    assert_eq!(config.status.project_id.as_deref(), Some("PVT_kwDOA"));
    assert_eq!(config.logging.filter, "specsync=debug");
    let settings = config.status_settings().expect("status settings");
    assert_eq!(settings.fallback, "Backlog");
    assert_eq!(settings.verify_retries, 2);
    assert_eq!(settings.status_for(Phase::Implementation), "Doing");
    assert_eq!(settings.status_for(Phase::Testing), "QA");
    assert_eq!(settings.status_for(Phase::Completed), "Done");
}

#[rstest]
fn missing_tracker_section_is_a_parse_error() {
    let result = SyncConfig::from_toml_str("[logging]\nfilter = \"debug\"\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[rstest]
#[case("owner = \"  \"\nrepository = \"checkout\"", "tracker.owner")]
#[case("owner = \"acme\"\nrepository = \"\"", "tracker.repository")]
#[case(
    "owner = \"acme\"\nrepository = \"checkout\"\nmax_children = 0",
    "tracker.max_children"
)]
fn out_of_range_values_are_rejected(#[case] tracker: &str, #[case] expected: &str) {
    let source = format!("[tracker]\n{tracker}\n");
    let result = SyncConfig::from_toml_str(&source);
    assert!(
        matches!(&result, Err(ConfigError::Invalid { field, .. }) if *field == expected),
        "{result:?}"
    );
}

#[rstest]
fn blank_fallback_is_rejected() {
    let source = format!("{MINIMAL}\n[status]\nfallback = \" \"\n");
    let result = SyncConfig::from_toml_str(&source);
    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "status.fallback",
            ..
        })
    ));
}

#[rstest]
fn unknown_phase_key_is_rejected() {
    let source = format!("{MINIMAL}\n[status.phase_map]\nreview = \"In Review\"\n");
    let result = SyncConfig::from_toml_str(&source);
    assert!(matches!(result, Err(ConfigError::UnknownPhase(phase)) if phase == "review"));
}

#[rstest]
fn secrets_are_read_from_the_environment() {
    let config = SyncConfig::from_toml_str(FULL).expect("valid config");
    let env = MapEnv::default()
        .with("ACME_TOKEN", "ghp_example")
        .with("ACME_HOOK_SECRET", "hook-secret");

    let github = config.github_settings(&env).expect("github settings");
    assert_eq!(github.token, "ghp_example");
    assert_eq!(github.owner, "acme");
    assert_eq!(github.api_base_url, "https://github.example.com/api/v3");
    let secret = config.webhook_secret(&env).expect("webhook secret");
    assert_eq!(secret.expose(), b"hook-secret");
}

#[rstest]
#[case(MapEnv::default())]
#[case(MapEnv::default().with("GITHUB_TOKEN", "   "))]
fn unset_or_blank_token_is_missing(#[case] env: MapEnv) {
    let config = SyncConfig::from_toml_str(MINIMAL).expect("valid config");
    let result = config.github_settings(&env);
    assert!(matches!(result, Err(ConfigError::MissingSecret(name)) if name == "GITHUB_TOKEN"));
}

#[rstest]
fn load_reads_a_file_from_disk() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
    let path = root.join("specsync.toml");
    std::fs::write(&path, FULL).expect("config written");

    let config = SyncConfig::load(&path).expect("loaded");

    assert_eq!(config.tracker.repository, "checkout");
}

#[rstest]
fn load_reports_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");

    let result = SyncConfig::load(&root.join("absent.toml"));

    assert!(matches!(result, Err(ConfigError::Io(_))));
}
