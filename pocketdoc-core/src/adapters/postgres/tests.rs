//! Unit tests for the PostgreSQL adapter that need no server.

use super::*;
use crate::error::ErrorKind;

fn adapter() -> PostgresAdapter {
    PostgresAdapter::new(
        ConnectionConfig::new("localhost".to_string()).with_database("app".to_string()),
        Credentials::new("reader".to_string(), Some("secret".to_string())),
    )
    .unwrap()
}

#[test]
fn test_decode_trigger_type_timing() {
    assert_eq!(decode_trigger_type(4).0, TriggerTiming::After);
    assert_eq!(decode_trigger_type(2 | 4).0, TriggerTiming::Before);
    assert_eq!(decode_trigger_type(64 | 1 | 4).0, TriggerTiming::InsteadOf);
}

#[test]
fn test_decode_trigger_type_events_and_level() {
    let (_, event, level) = decode_trigger_type(4 | 8 | 16);
    assert_eq!(event, "INSERT OR UPDATE OR DELETE");
    assert_eq!(level, TriggerLevel::Statement);

    let (_, event, level) = decode_trigger_type(32);
    assert_eq!(event, "TRUNCATE");
    assert_eq!(level, TriggerLevel::Statement);

    let (_, event, level) = decode_trigger_type(1 | 8);
    assert_eq!(event, "DELETE");
    assert_eq!(level, TriggerLevel::Row);
}

#[test]
fn test_decode_arguments_modes() {
    let names: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
    let modes: Vec<String> = ["i", "o", "b", "v", "t"].iter().map(|s| s.to_string()).collect();
    let types: Vec<String> = ["int", "text", "date", "int[]", "bool"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let args = decode_arguments(&names, &modes, &types);
    let modes: Vec<ArgumentMode> = args.iter().map(|a| a.mode).collect();
    assert_eq!(
        modes,
        [
            ArgumentMode::In,
            ArgumentMode::Out,
            ArgumentMode::InOut,
            ArgumentMode::In,
            ArgumentMode::Out
        ]
    );
    let positions: Vec<i32> = args.iter().map(|a| a.position).collect();
    assert_eq!(positions, [1, 2, 3, 4, 5]);
}

#[test]
fn test_decode_arguments_without_names_or_modes() {
    let args = decode_arguments(&[], &[], &["integer".to_string(), "text".to_string()]);
    assert_eq!(args.len(), 2);
    assert!(args.iter().all(|a| a.name.is_empty() && a.mode == ArgumentMode::In));
}

#[test]
fn test_connect_options_from_fields() {
    let config = ConnectionConfig::new("db.internal".to_string())
        .with_database("hr".to_string())
        .with_option("application_name", "catalog-docs");
    let options = connection::connect_options(
        &config,
        &Credentials::new("reader".to_string(), Some("pw".to_string())),
    );
    assert_eq!(options.get_host(), "db.internal");
    assert_eq!(options.get_port(), 5432);
    assert_eq!(options.get_username(), "reader");
    assert_eq!(options.get_database(), Some("hr"));
    assert_eq!(options.get_application_name(), Some("catalog-docs"));
}

#[test]
fn test_supports_everything_but_synonyms() {
    let adapter = adapter();
    assert_eq!(adapter.database_type(), DatabaseType::PostgreSql);
    assert!(adapter.supports(ObjectKind::Sequences));
    assert!(!adapter.supports(ObjectKind::Synonyms));
}

#[test]
fn test_debug_hides_password() {
    let debug = format!("{:?}", adapter());
    assert!(!debug.contains("secret"));
}

#[tokio::test]
async fn test_catalog_calls_before_connect_fail_with_connection_error() {
    let adapter = adapter();
    let ctx = ExtractionContext::new();
    let err = adapter.tables(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    let err = adapter.synonyms(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_close_is_idempotent_before_connect() {
    let mut adapter = adapter();
    adapter.close().await.unwrap();
    adapter.close().await.unwrap();
}

#[tokio::test]
async fn test_connect_respects_cancelled_context() {
    let mut adapter = adapter();
    let ctx = ExtractionContext::new();
    ctx.cancel();
    let err = adapter.connect(&ctx).await.unwrap_err();
    assert!(err.is_cancellation());
}
