//! Table/field metadata consumed by the schema-driven emitters
//!
//! The metadata store is owned elsewhere; the engine only reads it through
//! [`SchemaProvider`]. Two providers ship with the crate: [`SchemaFile`], a
//! YAML document exported from the metadata store, and [`InMemorySchema`]
//! for embedding and tests.
//!
//! ## Schema file format
//!
//! ```yaml
//! tables:
//!   - name: BOP_RATE
//!     index: 3
//!     fields:
//!       - column: POLICY_NO
//!         type: char
//!         length: 10
//!         key: true
//!       - column: BASE_PREM
//!         cobol_name: WS-BASE-PREMIUM
//!         type: decimal
//!         length: 11
//!         decimals: 2
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Schema lookup failures. Emitters degrade on these instead of aborting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("no schema bound")]
    Unavailable,

    #[error("failed to load schema from {path}: {message}")]
    Load { path: String, message: String },
}

/// Column data types known to the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[serde(alias = "short")]
    SmallInt,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "long")]
    BigInt,
    #[serde(alias = "numeric", alias = "packed")]
    Decimal,
    #[serde(alias = "double", alias = "real")]
    Float,
    #[default]
    Char,
    VarChar,
    Date,
    Time,
    Timestamp,
}

impl DataType {
    /// Numeric columns are zero-initialized, everything else gets spaces
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::SmallInt
                | DataType::Integer
                | DataType::BigInt
                | DataType::Decimal
                | DataType::Float
        )
    }
}

/// Metadata for one column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldMeta {
    /// Raw database column name
    #[serde(rename = "column")]
    pub column_name: String,

    /// Declared COBOL-safe name, if the metadata store has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cobol_name: Option<String>,

    #[serde(rename = "type", default)]
    pub data_type: DataType,

    #[serde(default)]
    pub length: u32,

    #[serde(default)]
    pub decimals: u32,

    #[serde(rename = "key", default)]
    pub is_key: bool,
}

impl FieldMeta {
    pub fn new(column_name: impl Into<String>, data_type: DataType, length: u32) -> Self {
        Self {
            column_name: column_name.into(),
            cobol_name: None,
            data_type,
            length,
            decimals: 0,
            is_key: false,
        }
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_cobol_name(mut self, name: impl Into<String>) -> Self {
        self.cobol_name = Some(name.into());
        self
    }

    /// Declared COBOL name, or the column name with `_` replaced by `-`
    pub fn cobol_name(&self) -> String {
        match &self.cobol_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => crate::util::to_cobol_name(&self.column_name),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.data_type.is_numeric()
    }

    /// COBOL figurative constant used to initialize the host variable
    pub fn initial_value(&self) -> &'static str {
        if self.is_numeric() {
            "ZERO"
        } else {
            "SPACES"
        }
    }

    /// COBOL PICTURE/USAGE clause for the host variable
    pub fn pic_clause(&self) -> String {
        match self.data_type {
            DataType::SmallInt => "PIC S9(4) COMP".to_string(),
            DataType::Integer => "PIC S9(9) COMP".to_string(),
            DataType::BigInt => "PIC S9(18) COMP".to_string(),
            DataType::Decimal => {
                let digits = self.length.max(1);
                let scale = self.decimals.min(digits);
                let integer = digits - scale;
                match (integer, scale) {
                    (i, 0) => format!("PIC S9({}) COMP-3", i),
                    (0, s) => format!("PIC SV9({}) COMP-3", s),
                    (i, s) => format!("PIC S9({})V9({}) COMP-3", i, s),
                }
            }
            DataType::Float => "COMP-2".to_string(),
            DataType::Char | DataType::VarChar => format!("PIC X({})", self.length.max(1)),
            DataType::Date => "PIC X(10)".to_string(),
            DataType::Time => "PIC X(8)".to_string(),
            DataType::Timestamp => "PIC X(26)".to_string(),
        }
    }

    /// DB2 column type as written in a `DECLARE TABLE` statement
    pub fn sql_type(&self) -> String {
        match self.data_type {
            DataType::SmallInt => "SMALLINT".to_string(),
            DataType::Integer => "INTEGER".to_string(),
            DataType::BigInt => "BIGINT".to_string(),
            DataType::Decimal => format!("DECIMAL({},{})", self.length.max(1), self.decimals),
            DataType::Float => "DOUBLE".to_string(),
            DataType::Char => format!("CHAR({})", self.length.max(1)),
            DataType::VarChar => format!("VARCHAR({})", self.length.max(1)),
            DataType::Date => "DATE".to_string(),
            DataType::Time => "TIME".to_string(),
            DataType::Timestamp => "TIMESTAMP".to_string(),
        }
    }

    /// Java field type
    pub fn java_type(&self) -> &'static str {
        match self.data_type {
            DataType::SmallInt => "short",
            DataType::Integer => "int",
            DataType::BigInt => "long",
            DataType::Decimal => "BigDecimal",
            DataType::Float => "double",
            DataType::Char | DataType::VarChar => "String",
            DataType::Date => "LocalDate",
            DataType::Time => "LocalTime",
            DataType::Timestamp => "LocalDateTime",
        }
    }

    /// JDBC accessor suffix (`getString`/`setString` -> `String`)
    pub fn jdbc_accessor(&self) -> &'static str {
        match self.data_type {
            DataType::SmallInt => "Short",
            DataType::Integer => "Int",
            DataType::BigInt => "Long",
            DataType::Decimal => "BigDecimal",
            DataType::Float => "Double",
            DataType::Char | DataType::VarChar => "String",
            DataType::Date | DataType::Time | DataType::Timestamp => "Object",
        }
    }
}

/// A table and its ordered fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableMeta {
    pub name: String,

    /// Position of the table in the rating algorithm's table list
    #[serde(default)]
    pub index: usize,

    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }
}

/// Read-only access to table/field metadata
pub trait SchemaProvider {
    /// Ordered fields of `table`
    fn fields(&self, table: &str) -> Result<Vec<FieldMeta>, SchemaError>;

    /// Key fields of `table`, in field order
    fn key_fields(&self, table: &str) -> Result<Vec<FieldMeta>, SchemaError> {
        Ok(self
            .fields(table)?
            .into_iter()
            .filter(|f| f.is_key)
            .collect())
    }

    /// Table names with their indexes, in schema order
    fn tables(&self) -> Result<Vec<(String, usize)>, SchemaError> {
        Ok(Vec::new())
    }
}

/// Provider used when no schema is configured; every lookup fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl SchemaProvider for NoSchema {
    fn fields(&self, _table: &str) -> Result<Vec<FieldMeta>, SchemaError> {
        Err(SchemaError::Unavailable)
    }
}

/// In-memory schema
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    tables: Vec<TableMeta>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableMeta) -> Self {
        self.insert(table);
        self
    }

    /// Insert or replace a table (matched case-insensitively)
    pub fn insert(&mut self, table: TableMeta) {
        match self
            .tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&table.name))
        {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableMeta> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

impl SchemaProvider for InMemorySchema {
    fn fields(&self, table: &str) -> Result<Vec<FieldMeta>, SchemaError> {
        self.table(table)
            .map(|t| t.fields.clone())
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))
    }

    fn tables(&self) -> Result<Vec<(String, usize)>, SchemaError> {
        Ok(self
            .tables
            .iter()
            .map(|t| (t.name.clone(), t.index))
            .collect())
    }
}

/// Schema document exported from the metadata store
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Rategen Schema", description = "Table/field metadata for code generation")]
pub struct SchemaFile {
    #[serde(default)]
    pub tables: Vec<TableMeta>,
}

impl SchemaFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        serde_norway::from_str(yaml).map_err(|e| SchemaError::Load {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_norway::from_str(&content).map_err(|e| SchemaError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn into_provider(self) -> InMemorySchema {
        self.tables
            .into_iter()
            .fold(InMemorySchema::new(), InMemorySchema::with_table)
    }
}

type Lookup = Result<Vec<FieldMeta>, SchemaError>;

/// Per-run memo of field lists, keyed by upper-cased table name
#[derive(Debug, Default)]
pub struct SchemaCache {
    fields: HashMap<String, Lookup>,
    keys: HashMap<String, Lookup>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(
        &mut self,
        provider: &dyn SchemaProvider,
        table: &str,
    ) -> Result<Vec<FieldMeta>, SchemaError> {
        self.fields
            .entry(table.to_ascii_uppercase())
            .or_insert_with(|| provider.fields(table))
            .clone()
    }

    pub fn key_fields(
        &mut self,
        provider: &dyn SchemaProvider,
        table: &str,
    ) -> Result<Vec<FieldMeta>, SchemaError> {
        self.keys
            .entry(table.to_ascii_uppercase())
            .or_insert_with(|| provider.key_fields(table))
            .clone()
    }

    /// [`key_fields`](Self::key_fields) when `keys_only`, else
    /// [`fields`](Self::fields)
    pub fn lookup(
        &mut self,
        provider: &dyn SchemaProvider,
        table: &str,
        keys_only: bool,
    ) -> Result<Vec<FieldMeta>, SchemaError> {
        if keys_only {
            self.key_fields(provider, table)
        } else {
            self.fields(provider, table)
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
