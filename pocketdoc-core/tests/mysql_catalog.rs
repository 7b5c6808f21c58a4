//! MySQL catalog extraction against a real server.
//!
//! This test suite covers:
//! - Tables, columns, constraint flags and indexes from INFORMATION_SCHEMA
//! - Views, routines with signatures and triggers
//! - Empty sequence and synonym collections
//! - Absence of view, routine and trigger source in the output

#![cfg(feature = "mysql")]

use pocketdoc_core::{
    ConnectionConfig, Credentials, ExtractionContext, ObjectKind, PocketDocError, Result,
    SchemaExtractor, adapters::mysql::MySqlAdapter, models::*,
};
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers_modules::{mysql::Mysql, testcontainers::runners::AsyncRunner};

/// Helper function to wait for MySQL to be ready
async fn wait_for_mysql_ready(database_url: &str, max_attempts: u32) -> Result<()> {
    let mut attempts = 0;
    while attempts < max_attempts {
        if let Ok(pool) = MySqlPool::connect(database_url).await {
            if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                pool.close().await;
                return Ok(());
            }
            pool.close().await;
        }
        attempts += 1;
        if attempts < max_attempts {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
    Err(PocketDocError::connection_failed(
        "waiting for MySQL",
        std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("MySQL failed to become ready after {} attempts", max_attempts),
        ),
    ))
}

const FIXTURE: &[&str] = &[
    "CREATE TABLE departments (
        department_id INT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(100) NOT NULL UNIQUE
    ) COMMENT = 'Org units'",
    "CREATE TABLE employees (
        employee_id INT AUTO_INCREMENT PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        salary DECIMAL(10, 2) DEFAULT 0,
        department_id INT,
        INDEX employees_dept_email_idx (department_id, email),
        CONSTRAINT employees_dept_fk FOREIGN KEY (department_id)
            REFERENCES departments (department_id)
    )",
    "CREATE VIEW employee_emails AS SELECT employee_id, email FROM employees",
    "CREATE FUNCTION raise_salary(emp_id INT, pct DECIMAL(5, 2)) RETURNS DECIMAL(10, 2)
        DETERMINISTIC RETURN pct * 2",
    "CREATE PROCEDURE archive_employee(IN emp_id INT, OUT archived TINYINT)
        SELECT 1 INTO archived",
    "CREATE TRIGGER employees_audit BEFORE UPDATE ON employees
        FOR EACH ROW SET NEW.salary = NEW.salary",
];

#[tokio::test]
async fn test_mysql_extracts_connected_database() -> Result<()> {
    let mysql = Mysql::default().start().await.unwrap();
    let port = mysql.get_host_port_ipv4(3306).await.unwrap();
    let database_url = format!("mysql://root@localhost:{}/test", port);
    wait_for_mysql_ready(&database_url, 60).await?;

    let pool = MySqlPool::connect(&database_url).await.unwrap();
    for statement in FIXTURE {
        sqlx::raw_sql(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;

    let config = ConnectionConfig::new("localhost".to_string())
        .with_port(port)
        .with_database("test".to_string());
    let mut adapter = MySqlAdapter::new(config, Credentials::new("root".to_string(), None))?;
    let ctx = ExtractionContext::new().with_timeout(Duration::from_secs(60));

    adapter.connect(&ctx).await?;
    let result = adapter.extract_schema(&ctx).await;
    adapter.close().await?;
    let schema = result?;

    assert_eq!(schema.database_type, DatabaseType::MySql);
    assert_eq!(schema.database_name, "test");

    // Tables and columns
    let employees = schema
        .tables
        .iter()
        .find(|t| t.name == "employees")
        .expect("employees table");
    assert_eq!(employees.owner.as_deref(), Some("test"));
    assert_eq!(employees.table_type, "InnoDB");
    let id = &employees.columns[0];
    assert_eq!(id.name, "employee_id");
    assert!(id.is_primary_key);
    assert!(id.is_auto_increment);

    let department = employees
        .columns
        .iter()
        .find(|c| c.name == "department_id")
        .unwrap();
    assert!(department.is_foreign_key);
    assert_eq!(department.fk_target_table.as_deref(), Some("test.departments"));
    assert_eq!(department.fk_target_column.as_deref(), Some("department_id"));

    let departments = schema.tables.iter().find(|t| t.name == "departments").unwrap();
    assert_eq!(departments.comment.as_deref(), Some("Org units"));
    assert!(departments.columns.iter().any(|c| c.name == "name" && c.is_unique));

    // Indexes
    let composite = employees
        .indexes
        .iter()
        .find(|i| i.name == "employees_dept_email_idx")
        .expect("composite index");
    assert_eq!(composite.columns, ["department_id", "email"]);
    let primary = employees.indexes.iter().find(|i| i.is_primary).unwrap();
    assert!(primary.is_unique);
    assert_eq!(
        schema.indexes.len(),
        schema.tables.iter().map(|t| t.indexes.len()).sum::<usize>()
    );

    // Views: MySQL stores 'VIEW' as the comment of every view
    let view = schema.views.iter().find(|v| v.name == "employee_emails").unwrap();
    assert_eq!(view.columns.len(), 2);
    assert!(view.comment.is_none());

    // Routines
    let raise = schema.routines.iter().find(|r| r.name == "raise_salary").unwrap();
    assert_eq!(raise.routine_type, RoutineType::Function);
    assert!(raise.is_deterministic);
    assert_eq!(raise.return_type.as_deref(), Some("decimal(10,2)"));
    assert_eq!(raise.arguments.len(), 2);
    assert!(raise.signature.starts_with("FUNCTION raise_salary(emp_id IN int, pct IN decimal(5,2))"));

    let archive = schema
        .routines
        .iter()
        .find(|r| r.name == "archive_employee")
        .unwrap();
    assert_eq!(archive.routine_type, RoutineType::Procedure);
    assert_eq!(archive.arguments[1].mode, ArgumentMode::Out);

    // Triggers
    let trigger = &schema.triggers[0];
    assert_eq!(trigger.name, "employees_audit");
    assert_eq!(trigger.timing, TriggerTiming::Before);
    assert_eq!(trigger.event, "UPDATE");
    assert_eq!(trigger.level, TriggerLevel::Row);

    // Not MySQL concepts: empty, never an error
    assert!(schema.sequences.is_empty());
    assert!(schema.synonyms.is_empty());
    assert!(!adapter.supports(ObjectKind::Sequences));

    // No source text
    let json = schema.to_json_pretty()?;
    assert!(!json.contains("pct * 2"));
    assert!(!json.contains("SELECT 1 INTO"));
    assert!(!json.contains("NEW.salary"));
    Ok(())
}
