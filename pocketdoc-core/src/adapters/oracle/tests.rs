//! Unit tests for the Oracle adapter that need no server or client library.

use super::connection::CatalogRow;
use super::*;
use crate::adapters::config::SslMode;
use crate::error::ErrorKind;

fn adapter() -> OracleAdapter {
    OracleAdapter::new(
        ConnectionConfig::new("localhost".to_string()).with_database("FREEPDB1".to_string()),
        Credentials::new("hr".to_string(), Some("secret".to_string())),
    )
    .unwrap()
}

#[test]
fn test_connect_string_variants() {
    let plain = ConnectionConfig::new("ora.internal".to_string());
    assert_eq!(connect_string(&plain), "//ora.internal:1521");

    let tls = ConnectionConfig::new("ora.internal".to_string())
        .with_port(2484)
        .with_database("SALES".to_string())
        .with_ssl_mode(SslMode::Require);
    assert_eq!(connect_string(&tls), "tcps://ora.internal:2484/SALES");

    let verified = tls.with_ssl_mode(SslMode::VerifyFull);
    assert_eq!(
        connect_string(&verified),
        "tcps://ora.internal:2484/SALES?ssl_server_dn_match=true"
    );
}

#[test]
fn test_parse_trigger_type() {
    assert_eq!(
        parse_trigger_type("BEFORE EACH ROW"),
        Some((TriggerTiming::Before, TriggerLevel::Row))
    );
    assert_eq!(
        parse_trigger_type("AFTER STATEMENT"),
        Some((TriggerTiming::After, TriggerLevel::Statement))
    );
    assert_eq!(
        parse_trigger_type("INSTEAD OF"),
        Some((TriggerTiming::InsteadOf, TriggerLevel::Row))
    );
    assert_eq!(parse_trigger_type("COMPOUND"), None);
    assert_eq!(parse_trigger_type(""), None);
}

#[test]
fn test_packaged_routine_names_are_qualified() {
    assert_eq!(routines::qualified_name(Some("PAYROLL"), "RAISE_SALARY"), "PAYROLL.RAISE_SALARY");
    assert_eq!(routines::qualified_name(None, "RAISE_SALARY"), "RAISE_SALARY");
}

#[test]
fn test_security_type_from_authid() {
    assert_eq!(routines::security_type(Some("CURRENT_USER")).as_deref(), Some("INVOKER"));
    assert_eq!(routines::security_type(Some("DEFINER")).as_deref(), Some("DEFINER"));
    assert_eq!(routines::security_type(None), None);
}

#[test]
fn test_synonym_target_over_database_link() {
    assert_eq!(synonyms::target_object("EMP".to_string(), Some("HQ.EXAMPLE")), "EMP@HQ.EXAMPLE");
    assert_eq!(synonyms::target_object("EMP".to_string(), None), "EMP");
    assert_eq!(synonyms::target_object("EMP".to_string(), Some(" ")), "EMP");
}

#[test]
fn test_clamped_number_bounds() {
    let sql = sequences::clamped_number("s.MAX_VALUE");
    assert_eq!(
        sql,
        "LEAST(GREATEST(s.MAX_VALUE, -9223372036854775808), 9223372036854775807)"
    );
}

#[test]
fn test_catalog_row_decoding() {
    let row = CatalogRow::from_pairs(&[
        ("NAME", Some("EMPLOYEES")),
        ("NUM_ROWS", Some("107")),
        ("NULLABLE", Some("Y")),
        ("IDENTITY_COLUMN", Some("NO")),
        ("COMMENTS", None),
        ("BAD_NUMBER", Some("1.5")),
    ]);
    assert_eq!(row.required_text("NAME", "tables").unwrap(), "EMPLOYEES");
    assert_eq!(row.int("NUM_ROWS", "tables").unwrap(), Some(107));
    assert!(row.yes("NULLABLE", "columns").unwrap());
    assert!(!row.yes("IDENTITY_COLUMN", "columns").unwrap());
    assert_eq!(row.text("COMMENTS", "tables").unwrap(), None);

    let err = row.required_text("COMMENTS", "tables").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(err.to_string().contains("COMMENTS"));

    assert_eq!(row.int("BAD_NUMBER", "sequences").unwrap_err().kind(), ErrorKind::Query);
    assert_eq!(row.text("MISSING", "tables").unwrap_err().kind(), ErrorKind::Query);
}

#[test]
fn test_default_scope_is_session_user() {
    let clause = adapter().config.schema_filter.clause("t.OWNER", &SCOPE, 1);
    assert_eq!(clause.sql, "t.OWNER = USER");
    assert!(clause.binds.is_empty());

    let filtered = ConnectionConfig::new("db".to_string()).with_schema_filter(["HR", "PUBLIC"]);
    let clause = filtered.schema_filter.clause("s.OWNER", &SCOPE, 1);
    assert_eq!(clause.sql, "s.OWNER IN (:1, :2)");
    assert_eq!(clause.binds, ["HR", "PUBLIC"]);
}

#[test]
fn test_debug_hides_password() {
    let debug = format!("{:?}", adapter());
    assert!(!debug.contains("secret"));
    assert!(debug.contains("connected: false"));
}

#[tokio::test]
async fn test_catalog_calls_before_connect_fail_with_connection_error() {
    let adapter = adapter();
    let ctx = ExtractionContext::new();
    assert_eq!(adapter.tables(&ctx).await.unwrap_err().kind(), ErrorKind::Connection);
    assert_eq!(adapter.routines(&ctx).await.unwrap_err().kind(), ErrorKind::Connection);
    assert_eq!(adapter.synonyms(&ctx).await.unwrap_err().kind(), ErrorKind::Connection);
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
    assert!(adapter.connect(&ctx).await.unwrap_err().is_cancellation());
}
