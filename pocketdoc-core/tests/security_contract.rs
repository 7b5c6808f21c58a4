//! Security contract tests for the canonical model.
//!
//! A fully populated schema is serialized and every field name at every
//! depth is checked against names that could carry executable source.

use chrono::Utc;
use pocketdoc_core::adapters::signature::build_signature;
use pocketdoc_core::models::*;
use serde_json::Value;

const FORBIDDEN_FIELDS: &[&str] = &[
    "definition",
    "body",
    "source",
    "sourceCode",
    "text",
    "sql",
    "query",
    "code",
    "viewDefinition",
    "routineDefinition",
    "triggerBody",
    "actionStatement",
];

fn column(name: &str, position: i32) -> Column {
    let mut column = Column {
        name: name.to_string(),
        position,
        data_type: "NUMBER".to_string(),
        length: Some(22),
        precision: Some(10),
        scale: Some(2),
        nullable: false,
        default_value: Some("0".to_string()),
        comment: Some("identifier".to_string()),
        is_primary_key: true,
        is_unique: true,
        is_auto_increment: true,
        character_set: Some("AL32UTF8".to_string()),
        collation: Some("BINARY".to_string()),
        ..Default::default()
    };
    column.set_foreign_key("HR.DEPARTMENTS", "DEPARTMENT_ID");
    column
}

fn populated_schema() -> Schema {
    let index = Index {
        name: "EMP_PK".to_string(),
        table_name: "EMPLOYEES".to_string(),
        owner: Some("HR".to_string()),
        index_type: "NORMAL".to_string(),
        columns: vec!["EMPLOYEE_ID".to_string()],
        is_unique: true,
        is_primary: true,
        is_enabled: true,
        comment: Some("primary key".to_string()),
        created_at: Some("2024-01-01T00:00:00".to_string()),
    };
    let arguments = vec![
        RoutineArgument {
            name: "EMP_ID".to_string(),
            position: 1,
            mode: ArgumentMode::In,
            data_type: "NUMBER".to_string(),
            default_value: Some("1".to_string()),
            comment: Some("employee".to_string()),
        },
        RoutineArgument {
            name: "PCT".to_string(),
            position: 2,
            mode: ArgumentMode::In,
            data_type: "NUMBER".to_string(),
            default_value: None,
            comment: None,
        },
    ];

    Schema {
        database_name: "HRDB".to_string(),
        database_type: DatabaseType::Oracle,
        version: "Oracle Database 23ai".to_string(),
        extracted_at: Utc::now(),
        comment: Some("nightly".to_string()),
        tables: vec![Table {
            name: "EMPLOYEES".to_string(),
            owner: Some("HR".to_string()),
            table_type: "TABLE".to_string(),
            comment: Some("staff".to_string()),
            columns: vec![column("EMPLOYEE_ID", 1)],
            indexes: vec![index.clone()],
            row_count: Some(107),
            created_at: Some("2024-01-01T00:00:00".to_string()),
            modified_at: Some("2024-01-02T00:00:00".to_string()),
        }],
        views: vec![View {
            name: "EMP_DETAILS".to_string(),
            owner: Some("HR".to_string()),
            view_type: "VIEW".to_string(),
            comment: Some("joined".to_string()),
            columns: vec![column("EMPLOYEE_ID", 1)],
            is_updatable: false,
            created_at: Some("2024-01-01T00:00:00".to_string()),
            modified_at: Some("2024-01-02T00:00:00".to_string()),
        }],
        routines: vec![Routine {
            signature: build_signature(RoutineType::Procedure, "RAISE_SALARY", &arguments, None),
            name: "RAISE_SALARY".to_string(),
            owner: Some("HR".to_string()),
            routine_type: RoutineType::Procedure,
            comment: Some("annual review".to_string()),
            arguments,
            return_type: None,
            language: Some("PL/SQL".to_string()),
            is_deterministic: false,
            security_type: Some("DEFINER".to_string()),
            created_at: Some("2024-01-01T00:00:00".to_string()),
            modified_at: Some("2024-01-02T00:00:00".to_string()),
        }],
        sequences: vec![Sequence {
            name: "EMP_SEQ".to_string(),
            owner: Some("HR".to_string()),
            min_value: 1,
            max_value: i64::MAX,
            increment: 1,
            last_number: 207,
            cache_size: Some(20),
            is_cyclic: false,
            is_ordered: false,
            comment: Some("ids".to_string()),
            created_at: Some("2024-01-01T00:00:00".to_string()),
        }],
        triggers: vec![Trigger {
            name: "EMP_AUDIT".to_string(),
            owner: Some("HR".to_string()),
            target_table: "EMPLOYEES".to_string(),
            target_type: "TABLE".to_string(),
            timing: TriggerTiming::After,
            event: "INSERT OR UPDATE".to_string(),
            level: TriggerLevel::Row,
            status: TriggerStatus::Enabled,
            comment: Some("audit".to_string()),
            created_at: Some("2024-01-01T00:00:00".to_string()),
            modified_at: Some("2024-01-02T00:00:00".to_string()),
        }],
        synonyms: vec![Synonym {
            name: "STAFF".to_string(),
            owner: Some("PUBLIC".to_string()),
            target_object: "EMPLOYEES".to_string(),
            target_owner: Some("HR".to_string()),
            target_type: Some("TABLE".to_string()),
            is_public: true,
            comment: Some("alias".to_string()),
            created_at: Some("2024-01-01T00:00:00".to_string()),
        }],
        indexes: vec![index],
    }
}

fn collect_keys(value: &Value, keys: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                keys.push(key.clone());
                collect_keys(nested, keys);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_keys(item, keys)),
        _ => {}
    }
}

#[test]
fn test_security_serialized_schema_has_no_source_fields() {
    let value = serde_json::to_value(populated_schema()).unwrap();
    let mut keys = Vec::new();
    collect_keys(&value, &mut keys);

    assert!(keys.len() > 50, "schema should be fully populated");
    for key in &keys {
        assert!(
            !FORBIDDEN_FIELDS
                .iter()
                .any(|forbidden| forbidden.eq_ignore_ascii_case(key)),
            "model exposes forbidden field '{}'",
            key
        );
    }
}

#[test]
fn test_security_body_fields_dropped_on_input() {
    // Unknown fields are ignored, so injected body text never reaches the model
    let json = r#"{
        "name": "EMP_AUDIT",
        "targetTable": "EMPLOYEES",
        "targetType": "TABLE",
        "timing": "AFTER",
        "event": "INSERT",
        "level": "ROW",
        "status": "ENABLED",
        "triggerBody": "BEGIN NULL; END;"
    }"#;
    let trigger: Trigger = serde_json::from_str(json).unwrap();
    let round_trip = serde_json::to_string(&trigger).unwrap();
    assert!(!round_trip.contains("BEGIN"));
    assert!(!round_trip.contains("triggerBody"));
}

#[test]
fn test_security_signature_holds_no_body_keywords() {
    let schema = populated_schema();
    let routine = &schema.routines[0];
    assert_eq!(
        routine.signature,
        "PROCEDURE RAISE_SALARY(EMP_ID IN NUMBER, PCT IN NUMBER)"
    );
    for keyword in ["BEGIN", "SELECT", "CREATE", "END;", "DECLARE"] {
        assert!(!routine.signature.contains(keyword));
    }
}

#[test]
fn test_security_empty_collections_are_omitted() {
    let schema = Schema::new(
        DatabaseType::MySql,
        DatabaseInfo {
            name: "shop".to_string(),
            version: "8.4.0".to_string(),
        },
    );
    let value = serde_json::to_value(&schema).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("sequences"));
    assert!(!object.contains_key("synonyms"));
    assert_eq!(object["databaseType"], "mysql");
}
