//! Integration tests for orgdesk-core infrastructure

use orgdesk_core::{
    config_error, conflict_error, init_logging, not_found_error, storage_error, validation_error,
    LogFormat, LoggingConfig, OrgdeskConfig, OrgdeskError,
};

#[test]
fn test_error_handling() {
    let error = storage_error!("membership lookup failed", "membership_store");

    match &error {
        OrgdeskError::Storage {
            message, context, ..
        } => {
            assert_eq!(message, "membership lookup failed");
            assert_eq!(context.component, "membership_store");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Storage error"),
    }
    assert!(error.is_infrastructure());

    // Logging without a subscriber must not panic
    error.log();

    let validation = validation_error!("slug is invalid", "slug", "organizations");
    assert!(!validation.is_infrastructure());
    match validation {
        OrgdeskError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("slug")),
        _ => panic!("Expected Validation error"),
    }

    assert!(!not_found_error!("organization org1", "organizations").is_infrastructure());
    assert!(!conflict_error!("slug taken", "organizations").is_infrastructure());
    assert!(config_error!("bad config", "config").is_infrastructure());
}

#[test]
fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        filter_directives: vec!["orgdesk_core=debug".to_string()],
        ..Default::default()
    };

    // Only the first initialisation in a process can succeed
    let first = init_logging(&config);
    let second = init_logging(&config);
    assert!(first.is_ok());
    assert!(second.is_err());
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orgdesk.toml");

    let mut config = OrgdeskConfig::default();
    config.server.port = 4100;
    config.server.dev_mode = true;
    config.database.url = Some("sqlite://orgdesk.db".to_string());
    config.save_to_file(&path).unwrap();

    let loaded = OrgdeskConfig::from_file(&path).unwrap();
    assert_eq!(loaded.server.port, 4100);
    assert!(loaded.server.dev_mode);
    assert_eq!(loaded.database.url.as_deref(), Some("sqlite://orgdesk.db"));
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "[server]\nport = 5000\n").unwrap();

    let loaded = OrgdeskConfig::from_file(&path).unwrap();
    assert_eq!(loaded.server.port, 5000);
    assert_eq!(loaded.server.host, "127.0.0.1");
    assert_eq!(loaded.auth.session_cookie_name, "orgdesk_session");
}

#[test]
fn test_missing_config_file_is_config_error() {
    let result = OrgdeskConfig::from_file("/nonexistent/orgdesk.toml");
    assert!(matches!(result, Err(OrgdeskError::Config { .. })));
}
