//! Table schemas.
//!
//! A `TableSchema` is the ordered list of columns of a table plus its
//! ordered primary key. Each column carries a role: key columns form the
//! primary key and are never null, value columns hold the rest of the row.
//!
//! # Example
//!
//! ```rust
//! use trellis_common::schema::{ColumnSchema, TableSchema};
//! use trellis_common::types::DataType;
//!
//! let album = TableSchema::builder("Album")
//!     .column(ColumnSchema::new("albumId", DataType::Int32))
//!     .column(ColumnSchema::new("title", DataType::String).max_length(25))
//!     .column(ColumnSchema::new("artistId", DataType::Int32))
//!     .column(ColumnSchema::new("releaseYear", DataType::Int32).nullable(true))
//!     .primary_key(&["albumId", "artistId"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(album.name(), "ALBUM");
//! assert_eq!(album.key_columns().count(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_COLUMNS, MAX_IDENTIFIER_LENGTH};
use crate::error::{TrellisError, TrellisResult};
use crate::types::{normalize_identifier, DataType, Value};

/// Role of a column within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Part of the primary key.
    Key,
    /// Non-key column.
    Value,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Normalised column name.
    pub name: String,
    /// Column type.
    pub data_type: DataType,
    /// Whether NULL is allowed. Always false for key columns.
    pub nullable: bool,
    /// Column role, assigned when the table schema is built.
    pub role: ColumnRole,
    /// Maximum length of `String`/`Bytes` values.
    pub max_length: Option<u32>,
}

impl ColumnSchema {
    /// Creates a non-nullable value column.
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: normalize_identifier(name),
            data_type,
            nullable: false,
            role: ColumnRole::Value,
            max_length: None,
        }
    }

    /// Sets nullability.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Returns true if this is a primary key column.
    #[must_use]
    pub fn is_key(&self) -> bool {
        self.role == ColumnRole::Key
    }

    /// Checks a value against this column and converts it to the column
    /// type.
    ///
    /// Rejects NULL in a non-nullable column, values whose type cannot be
    /// widened to the column type, and strings or byte arrays longer than
    /// `max_length`.
    pub fn admit(&self, table: &str, value: Value) -> TrellisResult<Value> {
        if value.is_null() {
            if self.nullable {
                return Ok(Value::Null);
            }
            return Err(TrellisError::ConstraintViolation {
                table: table.to_string(),
                message: format!("column {} is not nullable", self.name),
            });
        }

        let value = value.coerce_to(self.data_type).map_err(|e| match e {
            TrellisError::TypeMismatch { expected, actual } => TrellisError::TypeMismatch {
                expected: format!("{expected} for column {}", self.name),
                actual,
            },
            other => other,
        })?;

        if let (Some(max), Some(len)) = (self.max_length, value.length()) {
            if len > max as usize {
                return Err(TrellisError::ConstraintViolation {
                    table: table.to_string(),
                    message: format!(
                        "value of length {len} exceeds maximum {max} of column {}",
                        self.name
                    ),
                });
            }
        }
        Ok(value)
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if let Some(max) = self.max_length {
            write!(f, "({max})")?;
        }
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Schema of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnSchema>,
    /// Column positions of the primary key, in key order.
    primary_key: Vec<usize>,
    index: HashMap<String, usize>,
}

impl TableSchema {
    /// Starts building a schema for the named table.
    pub fn builder(name: &str) -> TableSchemaBuilder {
        TableSchemaBuilder {
            name: normalize_identifier(name),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Returns the normalised table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Looks up a column by normalised name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Returns the position of a column by normalised name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the key columns in primary key order.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.primary_key.iter().map(|&i| &self.columns[i])
    }

    /// Returns the value columns in declaration order.
    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| !c.is_key())
    }

    /// Returns the column positions of the primary key.
    #[must_use]
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    /// Returns true if the named column is a key column.
    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.column(name).is_some_and(ColumnSchema::is_key)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.name)?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{column}")?;
        }
        let key: Vec<&str> = self.key_columns().map(|c| c.name.as_str()).collect();
        write!(f, ", PRIMARY KEY ({}))", key.join(", "))
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug, Clone)]
pub struct TableSchemaBuilder {
    name: String,
    columns: Vec<ColumnSchema>,
    primary_key: Vec<String>,
}

impl TableSchemaBuilder {
    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares the primary key, in key order.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| normalize_identifier(c)).collect();
        self
    }

    /// Validates and builds the schema.
    ///
    /// Key columns are forced non-nullable and get the `Key` role; every
    /// other column gets the `Value` role.
    pub fn build(self) -> TrellisResult<TableSchema> {
        let invalid = |message: String| TrellisError::InvalidSchema {
            table: self.name.clone(),
            message,
        };

        if self.name.is_empty() || self.name.len() > MAX_IDENTIFIER_LENGTH {
            return Err(invalid(format!(
                "table name must be 1 to {MAX_IDENTIFIER_LENGTH} characters"
            )));
        }
        if self.columns.is_empty() || self.columns.len() > MAX_COLUMNS {
            return Err(invalid(format!(
                "a table needs 1 to {MAX_COLUMNS} columns"
            )));
        }
        if self.primary_key.is_empty() {
            return Err(invalid("primary key is not declared".to_string()));
        }

        let mut index = HashMap::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            if column.name.is_empty() || column.name.len() > MAX_IDENTIFIER_LENGTH {
                return Err(invalid(format!("invalid column name '{}'", column.name)));
            }
            if index.insert(column.name.clone(), i).is_some() {
                return Err(invalid(format!("duplicate column {}", column.name)));
            }
        }

        let mut primary_key = Vec::with_capacity(self.primary_key.len());
        for name in &self.primary_key {
            let Some(&i) = index.get(name) else {
                return Err(invalid(format!("primary key column {name} is not defined")));
            };
            if primary_key.contains(&i) {
                return Err(invalid(format!("primary key repeats column {name}")));
            }
            primary_key.push(i);
        }

        let mut columns = self.columns;
        for (i, column) in columns.iter_mut().enumerate() {
            if primary_key.contains(&i) {
                column.role = ColumnRole::Key;
                column.nullable = false;
            } else {
                column.role = ColumnRole::Value;
            }
        }

        Ok(TableSchema {
            name: self.name,
            columns,
            primary_key,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album() -> TableSchema {
        TableSchema::builder("Album")
            .column(ColumnSchema::new("albumId", DataType::Int32).nullable(true))
            .column(ColumnSchema::new("title", DataType::String).max_length(5))
            .column(ColumnSchema::new("artistId", DataType::Int32))
            .column(ColumnSchema::new("releaseYear", DataType::Int64).nullable(true))
            .primary_key(&["artistId", "albumId"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_roles_and_key_order() {
        let schema = album();
        let keys: Vec<&str> = schema.key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(keys, vec!["ARTISTID", "ALBUMID"]);
        let values: Vec<&str> = schema.value_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(values, vec!["TITLE", "RELEASEYEAR"]);
        assert!(schema.is_key("ALBUMID"));
        assert!(!schema.is_key("TITLE"));
        assert!(!schema.column("ALBUMID").unwrap().nullable);
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let dup = TableSchema::builder("t")
            .column(ColumnSchema::new("a", DataType::Int32))
            .column(ColumnSchema::new("A", DataType::Int32))
            .primary_key(&["a"])
            .build();
        assert!(matches!(dup, Err(TrellisError::InvalidSchema { .. })));

        let unknown_key = TableSchema::builder("t")
            .column(ColumnSchema::new("a", DataType::Int32))
            .primary_key(&["b"])
            .build();
        assert!(unknown_key.is_err());

        let no_key = TableSchema::builder("t")
            .column(ColumnSchema::new("a", DataType::Int32))
            .build();
        assert!(no_key.is_err());
    }

    #[test]
    fn test_admit() {
        let schema = album();
        let title = schema.column("TITLE").unwrap();
        let year = schema.column("RELEASEYEAR").unwrap();

        assert_eq!(year.admit("ALBUM", Value::Int32(1989)).unwrap(), Value::Int64(1989));
        assert_eq!(year.admit("ALBUM", Value::Null).unwrap(), Value::Null);
        assert!(matches!(
            title.admit("ALBUM", Value::Null),
            Err(TrellisError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            title.admit("ALBUM", Value::from("Technique")),
            Err(TrellisError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            title.admit("ALBUM", Value::Int32(1)),
            Err(TrellisError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_column_schema_serde() {
        let column = ColumnSchema::new("title", DataType::String).max_length(25);
        let json = serde_json::to_string(&column).unwrap();
        assert!(json.contains("\"data_type\":\"string\""));
        let back: ColumnSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, column);
    }

    #[test]
    fn test_display() {
        let schema = TableSchema::builder("Person2")
            .column(ColumnSchema::new("id", DataType::Int32))
            .column(ColumnSchema::new("name", DataType::String).nullable(true))
            .primary_key(&["id"])
            .build()
            .unwrap();
        assert_eq!(
            schema.to_string(),
            "PERSON2 (ID INT NOT NULL, NAME VARCHAR, PRIMARY KEY (ID))"
        );
    }
}
