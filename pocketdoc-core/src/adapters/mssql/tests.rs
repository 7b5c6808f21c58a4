//! Unit tests for the SQL Server adapter that need no server.

use super::*;
use crate::adapters::config::SslMode;
use crate::error::ErrorKind;

fn adapter() -> SqlServerAdapter {
    SqlServerAdapter::new(
        ConnectionConfig::new("localhost".to_string()).with_database("Sales".to_string()),
        Credentials::new("reader".to_string(), Some("secret".to_string())),
    )
    .unwrap()
}

#[test]
fn test_split_base_object_variants() {
    assert_eq!(
        split_base_object("[dbo].[Orders]"),
        (Some("dbo".to_string()), "Orders".to_string())
    );
    assert_eq!(
        split_base_object("[remote].[Sales].[hr].[Emp]"),
        (Some("hr".to_string()), "Emp".to_string())
    );
    assert_eq!(
        split_base_object("[dbo].[Order.Lines]"),
        (Some("dbo".to_string()), "Order.Lines".to_string())
    );
    assert_eq!(
        split_base_object("[dbo].[odd]]name]"),
        (Some("dbo".to_string()), "odd]name".to_string())
    );
    assert_eq!(split_base_object("Sales..Orders"), (None, "Orders".to_string()));
}

#[test]
fn test_synonym_target_types() {
    assert_eq!(synonyms::target_type("U "), Some("TABLE"));
    assert_eq!(synonyms::target_type("V"), Some("VIEW"));
    assert_eq!(synonyms::target_type("PC"), Some("PROCEDURE"));
    assert_eq!(synonyms::target_type("IF"), Some("FUNCTION"));
    assert_eq!(synonyms::target_type("SO"), Some("SEQUENCE"));
    assert_eq!(synonyms::target_type("TT"), None);
}

#[test]
fn test_classify_routine_object_types() {
    assert_eq!(routines::classify("P "), (RoutineType::Procedure, "T-SQL"));
    assert_eq!(routines::classify("PC"), (RoutineType::Procedure, "CLR"));
    assert_eq!(routines::classify("FN"), (RoutineType::Function, "T-SQL"));
    assert_eq!(routines::classify("TF"), (RoutineType::Function, "T-SQL"));
    assert_eq!(routines::classify("FS"), (RoutineType::Function, "CLR"));
}

#[test]
fn test_join_events() {
    assert_eq!(triggers::join_events(true, false, false), "INSERT");
    assert_eq!(triggers::join_events(true, true, true), "INSERT OR UPDATE OR DELETE");
    assert_eq!(triggers::join_events(false, true, true), "UPDATE OR DELETE");
}

#[test]
fn test_clamped_bigint_saturates_both_bounds() {
    let sql = sequences::clamped_bigint("seq.maximum_value");
    assert!(sql.contains("CAST(seq.maximum_value AS DECIMAL(38, 0)) > 9223372036854775807"));
    assert!(sql.contains("< -9223372036854775808"));
    assert!(sql.ends_with("AS BIGINT)"));
}

#[test]
fn test_description_join_fragment() {
    let sql = connection::description_join("ep", "c.object_id", "c.column_id", 1);
    assert!(sql.starts_with("LEFT JOIN sys.extended_properties ep"));
    assert!(sql.contains("ep.minor_id = c.column_id"));
    assert!(sql.contains("ep.name = 'MS_Description'"));
}

#[test]
fn test_tiberius_config_address_and_encryption() {
    let config = ConnectionConfig::new("mssql.internal".to_string())
        .with_port(14330)
        .with_ssl_mode(SslMode::Require);
    let tds = connection::tiberius_config(&config, &Credentials::default());
    assert_eq!(tds.get_addr(), "mssql.internal:14330");

    let tds = connection::tiberius_config(
        &ConnectionConfig::new("db".to_string()),
        &Credentials::default(),
    );
    assert_eq!(tds.get_addr(), "db:1433");
}

#[test]
fn test_default_scope_is_dbo() {
    let clause = adapter().config.schema_filter.clause("s.name", &SCOPE, 1);
    assert_eq!(clause.sql, "s.name = 'dbo'");

    let filtered = ConnectionConfig::new("db".to_string()).with_schema_filter(["hr", "sales"]);
    let clause = filtered.schema_filter.clause("s.name", &SCOPE, 2);
    assert_eq!(clause.sql, "s.name IN (@P2, @P3)");
    assert_eq!(clause.binds, ["hr", "sales"]);
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
    assert_eq!(adapter.tables(&ctx).await.unwrap_err().kind(), ErrorKind::Connection);
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
