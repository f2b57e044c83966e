//! Table-driven tests for configuration loading and validation.

use std::path::PathBuf;

use videoforge::config::JobsConfig;
use videoforge::{load_config_from_str, SecretSource};

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{ "version": "1.0", "data_directory": "/data" }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "data_directory": "/srv/videoforge",
            "database_path": "/var/lib/videoforge/videoforge.db",
            "worker_count": 4,
            "log_level": "debug",
            "jobs": { "stalled_after_secs": 120, "poll_interval_ms": 250, "queue_capacity": 16 },
            "research": {
                "concurrency": 3,
                "per_page": 10,
                "safe_licenses": ["Pexels License", "CC0"],
                "cache_ttl_secs": 0,
                "keywords_per_segment": 4
            },
            "generation": {
                "endpoint": "http://localhost:8080/v1",
                "model": "llama-3",
                "temperature": 0.3,
                "max_tokens": 4000,
                "timeout_secs": 300,
                "api_key": { "value": "local-key" }
            },
            "search": { "api_key": { "env_var": "MY_PEXELS_KEY" } },
            "synthesis": { "model": "eleven_turbo_v2", "api_key": { "file": "/run/secrets/eleven" } },
            "muxing": { "ffmpeg": "/usr/bin/ffmpeg", "width": 1080, "height": 1920, "fps": 30 }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: r#"{ "version": "1.0", "data_directory": "#,
        should_succeed: false,
        expected_error: Some("parse"),
    },
    ConfigTestCase {
        name: "missing_data_directory",
        config_json: r#"{ "version": "1.0" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_top_level_key",
        config_json: r#"{ "version": "1.0", "data_directory": "/data", "output_directory": "/out" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "0.9", "data_directory": "/data" }"#,
        should_succeed: false,
        expected_error: Some("Unsupported config version"),
    },
    ConfigTestCase {
        name: "zero_workers",
        config_json: r#"{ "version": "1.0", "data_directory": "/data", "worker_count": 0 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_log_level",
        config_json: r#"{ "version": "1.0", "data_directory": "/data", "log_level": "loud" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "empty_license_list",
        config_json: r#"{
            "version": "1.0",
            "data_directory": "/data",
            "research": { "safe_licenses": [] }
        }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "blank_license",
        config_json: r#"{
            "version": "1.0",
            "data_directory": "/data",
            "research": { "safe_licenses": [" "] }
        }"#,
        should_succeed: false,
        expected_error: Some("safe_licenses"),
    },
    ConfigTestCase {
        name: "per_page_above_api_limit",
        config_json: r#"{ "version": "1.0", "data_directory": "/data", "research": { "per_page": 200 } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "non_http_generation_endpoint",
        config_json: r#"{
            "version": "1.0",
            "data_directory": "/data",
            "generation": { "endpoint": "file:///tmp/model" }
        }"#,
        should_succeed: false,
        expected_error: Some("generation.endpoint"),
    },
    ConfigTestCase {
        name: "unknown_secret_source_key",
        config_json: r#"{
            "version": "1.0",
            "data_directory": "/data",
            "search": { "api_key": { "vault": "pexels" } }
        }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
];

#[test]
fn test_json_config_loading() {
    for test_case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}': Expected success but got error: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Test '{}': Expected error but got success",
                test_case.name
            );

            if let Some(expected_error) = test_case.expected_error {
                let error_msg = result.err().unwrap().to_string();
                assert!(
                    error_msg.contains(expected_error),
                    "Test '{}': Expected error containing '{}', got '{}'",
                    test_case.name,
                    expected_error,
                    error_msg
                );
            }
        }
    }
}

/// Test config field values are read as written.
#[test]
fn test_valid_config_field_values() {
    let config = load_config_from_str(JSON_CONFIG_TESTS[1].config_json)
        .expect("Should load valid config");

    assert_eq!(config.worker_count, 4);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.jobs.queue_capacity, 16);
    assert_eq!(config.research.per_page, 10);
    assert_eq!(config.research.cache_ttl_secs, 0);
    assert_eq!(config.generation.model, "llama-3");
    assert_eq!(
        config.generation.api_key,
        SecretSource {
            value: Some("local-key".to_string()),
            ..Default::default()
        }
    );
    assert_eq!(
        config.search.api_key.env_var.as_deref(),
        Some("MY_PEXELS_KEY")
    );
    assert_eq!(
        config.resolved_database_path(),
        PathBuf::from("/var/lib/videoforge/videoforge.db")
    );
    assert_eq!(config.clips_dir(), PathBuf::from("/srv/videoforge/clips"));
    assert_eq!((config.muxing.width, config.muxing.height), (1080, 1920));
}

/// Test config defaults are applied correctly.
#[test]
fn test_config_defaults_applied() {
    let config = load_config_from_str(JSON_CONFIG_TESTS[0].config_json)
        .expect("Should load config");

    // worker_count should default to num_cpus
    assert!(config.worker_count >= 1);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.jobs.stalled_after_secs, JobsConfig::default().stalled_after_secs);
    assert_eq!(config.search.endpoint, "https://api.pexels.com");
    assert_eq!(
        config.synthesis.api_key.env_var.as_deref(),
        Some("ELEVENLABS_API_KEY")
    );
    assert_eq!(config.muxing.fps, 30);
    assert_eq!(config.videos_dir(), PathBuf::from("/data/videos"));
}
