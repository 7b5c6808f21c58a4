//! Canonical, dialect-neutral catalog model.
//!
//! Every dialect adapter populates these structures identically. The model is
//! serialized with camelCase field names; optional values are omitted when
//! absent and empty collections are omitted from the root [`Schema`].
//!
//! # Security
//! No type in this module has a field able to hold view, routine or trigger
//! source text. Body text cannot leak because there is nowhere to put it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Oracle,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgresql")]
    PostgreSql,
    #[serde(rename = "mssql")]
    SqlServer,
}

impl DatabaseType {
    /// All dialects, in the order they are listed to users.
    pub const ALL: [DatabaseType; 4] = [
        DatabaseType::Oracle,
        DatabaseType::MySql,
        DatabaseType::PostgreSql,
        DatabaseType::SqlServer,
    ];

    /// Canonical configuration tag.
    pub fn tag(self) -> &'static str {
        match self {
            DatabaseType::Oracle => "oracle",
            DatabaseType::MySql => "mysql",
            DatabaseType::PostgreSql => "postgresql",
            DatabaseType::SqlServer => "mssql",
        }
    }

    /// Resolves a configuration tag or one of its aliases.
    ///
    /// Matching ignores case and surrounding whitespace.
    ///
    /// # Errors
    /// Returns `UnsupportedDatabase` naming the supported set for unknown tags.
    pub fn from_tag(tag: &str) -> crate::Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "oracle" => Ok(DatabaseType::Oracle),
            "mysql" => Ok(DatabaseType::MySql),
            "postgresql" | "postgres" | "pg" => Ok(DatabaseType::PostgreSql),
            "mssql" | "sqlserver" => Ok(DatabaseType::SqlServer),
            _ => Err(crate::error::PocketDocError::unsupported_database(tag.trim())),
        }
    }

    /// Port used when the configuration does not name one.
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseType::Oracle => 1521,
            DatabaseType::MySql => 3306,
            DatabaseType::PostgreSql => 5432,
            DatabaseType::SqlServer => 1433,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = crate::error::PocketDocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

/// Name and version reported by the connected server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: String,
}

/// Root aggregate of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub database_name: String,
    pub database_type: DatabaseType,
    pub version: String,
    pub extracted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<View>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routines: Vec<Routine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<Sequence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<Synonym>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
}

impl Schema {
    /// Creates an empty schema stamped with the current time.
    pub fn new(database_type: DatabaseType, info: DatabaseInfo) -> Self {
        Self {
            database_name: info.name,
            database_type,
            version: info.version,
            extracted_at: Utc::now(),
            comment: None,
            tables: Vec::new(),
            views: Vec::new(),
            routines: Vec::new(),
            sequences: Vec::new(),
            triggers: Vec::new(),
            synonyms: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Total number of top-level objects (indexes counted once).
    pub fn object_count(&self) -> usize {
        self.tables.len()
            + self.views.len()
            + self.routines.len()
            + self.sequences.len()
            + self.triggers.len()
            + self.synonyms.len()
            + self.indexes.len()
    }

    /// Serializes the schema as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a serialization error if encoding fails.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            crate::error::PocketDocError::serialization("encoding schema as JSON", e)
        })
    }
}

/// Table metadata with nested columns and indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub table_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    #[serde(default, skip_serializing_if = "is_none_or_zero")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// View metadata. Never carries the view's query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub view_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    pub is_updatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Column of a table or view.
///
/// `fk_target_table` and `fk_target_column` are only ever written together
/// through [`Column::set_foreign_key`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// 1-based ordinal, unique within the owning table or view
    pub position: i32,
    /// Dialect-native type spelling
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
    #[serde(default, skip_serializing_if = "is_none_or_zero")]
    pub scale: Option<i64>,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_target_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_target_column: Option<String>,
    pub is_auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl Column {
    /// Marks the column as a foreign key referencing `table.column`.
    pub fn set_foreign_key(&mut self, table: impl Into<String>, column: impl Into<String>) {
        self.is_foreign_key = true;
        self.fk_target_table = Some(table.into());
        self.fk_target_column = Some(column.into());
    }

    /// Removes any foreign key marking.
    pub fn clear_foreign_key(&mut self) {
        self.is_foreign_key = false;
        self.fk_target_table = None;
        self.fk_target_column = None;
    }
}

/// Stored procedure or function kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutineType {
    Procedure,
    Function,
}

impl RoutineType {
    /// Keyword used in signatures.
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineType::Procedure => "PROCEDURE",
            RoutineType::Function => "FUNCTION",
        }
    }
}

impl std::fmt::Display for RoutineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored procedure or function. Signature only, never the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub routine_type: RoutineType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<RoutineArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub is_deterministic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Parameter direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArgumentMode {
    In,
    Out,
    InOut,
}

impl ArgumentMode {
    /// Keyword used in signatures.
    pub fn as_str(self) -> &'static str {
        match self {
            ArgumentMode::In => "IN",
            ArgumentMode::Out => "OUT",
            ArgumentMode::InOut => "INOUT",
        }
    }

    /// Parses catalog spellings such as `IN`, `OUT`, `IN/OUT`, `IN OUT`, `INOUT`.
    ///
    /// Anything unrecognized is treated as `IN`.
    pub fn from_catalog(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "OUT" => ArgumentMode::Out,
            "INOUT" => ArgumentMode::InOut,
            _ => ArgumentMode::In,
        }
    }
}

impl std::fmt::Display for ArgumentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routine parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineArgument {
    pub name: String,
    /// 1-based catalog ordinal
    pub position: i32,
    pub mode: ArgumentMode,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Index with its key columns in key-sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub index_type: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Sequence generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub min_value: i64,
    pub max_value: i64,
    pub increment: i64,
    pub last_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<i64>,
    pub is_cyclic: bool,
    pub is_ordered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Trigger firing time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    #[serde(rename = "BEFORE")]
    Before,
    #[serde(rename = "AFTER")]
    After,
    #[serde(rename = "INSTEAD OF")]
    InsteadOf,
}

impl TriggerTiming {
    /// Parses the leading timing keyword of a catalog trigger type string.
    pub fn from_catalog(value: &str) -> Option<Self> {
        let upper = value.trim().to_ascii_uppercase();
        if upper.starts_with("INSTEAD OF") {
            Some(TriggerTiming::InsteadOf)
        } else if upper.starts_with("BEFORE") {
            Some(TriggerTiming::Before)
        } else if upper.starts_with("AFTER") {
            Some(TriggerTiming::After)
        } else {
            None
        }
    }
}

/// Trigger granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerLevel {
    Row,
    Statement,
}

/// Trigger status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerStatus {
    Enabled,
    Disabled,
}

/// Trigger metadata. Never carries the trigger body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub target_table: String,
    pub target_type: String,
    pub timing: TriggerTiming,
    /// `INSERT`, `UPDATE`, `DELETE`, or a dialect-specific spelling
    pub event: String,
    pub level: TriggerLevel,
    pub status: TriggerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Named alias for another database object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Synonym {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub target_object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Catalog object categories collected by an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Tables,
    Views,
    Routines,
    Sequences,
    Triggers,
    Synonyms,
    Indexes,
}

/// Converts an optional catalog string into a model value, treating blank
/// text as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == v.len() {
            Some(v)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Zero row counts and scales carry no information and are left out of the
/// output like absent values.
fn is_none_or_zero(value: &Option<i64>) -> bool {
    matches!(value, None | Some(0))
}

/// Converts a non-positive size into `None`; catalogs report 0 or -1 for
/// "not applicable".
pub fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}
