//! Record and key/value views.
//!
//! Views are stateless façades over one table. Each call converts its
//! arguments to a [`Tuple`], validates it against the schema, performs one
//! row store call and converts the result back:
//!
//! ```text
//!   caller shape ──encode──▶ Tuple ──check──▶ RowStore ──▶ Tuple ──decode──▶ caller shape
//! ```
//!
//! Validation failures (`SchemaMismatch`, `KeyIncomplete`) are raised before
//! the row store is contacted.

mod kv;
mod record;

pub use kv::KeyValueView;
pub use record::RecordView;

use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::tuple::Tuple;

use crate::mapping::{BoundMapping, Mapped};

// =============================================================================
// Codecs
// =============================================================================

/// Conversion between a caller-facing shape and a tuple.
pub(crate) trait TupleCodec<R>: Send + Sync {
    fn encode(&self, value: &R) -> Tuple;
    fn decode(&self, tuple: Tuple) -> TrellisResult<R>;
}

/// Codec for the tuple-shaped views.
pub(crate) struct Passthrough;

impl TupleCodec<Tuple> for Passthrough {
    fn encode(&self, value: &Tuple) -> Tuple {
        value.clone()
    }

    fn decode(&self, tuple: Tuple) -> TrellisResult<Tuple> {
        Ok(tuple)
    }
}

impl<T: Mapped> TupleCodec<T> for BoundMapping<T> {
    fn encode(&self, value: &T) -> Tuple {
        self.to_tuple(value)
    }

    fn decode(&self, tuple: Tuple) -> TrellisResult<T> {
        self.from_tuple(&tuple)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Checks a full row: known columns, complete non-null key.
pub(crate) fn check_row(schema: &TableSchema, row: &Tuple) -> TrellisResult<()> {
    for (column, _) in row.iter() {
        if schema.column(column).is_none() {
            return Err(mismatch(schema, column, "column does not exist"));
        }
    }
    check_key_complete(schema, row)
}

/// Checks a key: key columns only, all present and non-null.
pub(crate) fn check_key(schema: &TableSchema, key: &Tuple) -> TrellisResult<()> {
    for (column, _) in key.iter() {
        match schema.column(column) {
            None => return Err(mismatch(schema, column, "column does not exist")),
            Some(c) if !c.is_key() => {
                return Err(mismatch(schema, column, "value column in key tuple"))
            }
            Some(_) => {}
        }
    }
    check_key_complete(schema, key)
}

/// Checks the value half of a key/value pair: value columns only.
pub(crate) fn check_value(schema: &TableSchema, value: &Tuple) -> TrellisResult<()> {
    for (column, _) in value.iter() {
        match schema.column(column) {
            None => return Err(mismatch(schema, column, "column does not exist")),
            Some(c) if c.is_key() => return Err(mismatch(schema, column, "key column in value tuple")),
            Some(_) => {}
        }
    }
    Ok(())
}

fn check_key_complete(schema: &TableSchema, tuple: &Tuple) -> TrellisResult<()> {
    for key in schema.key_columns() {
        if tuple.column(&key.name).map_or(true, |v| v.is_null()) {
            return Err(TrellisError::KeyIncomplete {
                table: schema.name().to_string(),
                column: key.name.clone(),
            });
        }
    }
    Ok(())
}

fn mismatch(schema: &TableSchema, column: &str, reason: &str) -> TrellisError {
    TrellisError::SchemaMismatch {
        table: schema.name().to_string(),
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Key/Value Row Shapes
// =============================================================================

/// Joins a key and a value tuple into one row, key columns first.
pub(crate) fn concat(key: Tuple, value: Tuple) -> Tuple {
    let mut row = key;
    for (column, v) in value {
        row.insert_column(column, v);
    }
    row
}

/// Splits a row by column role into `(key, value)`.
///
/// Columns unknown to the schema land in the value half.
pub(crate) fn split(schema: &TableSchema, row: Tuple) -> (Tuple, Tuple) {
    let mut key = Tuple::with_capacity(schema.primary_key().len());
    let mut value = Tuple::with_capacity(row.len());
    for (column, v) in row {
        if schema.column(&column).is_some_and(|c| c.is_key()) {
            key.insert_column(column, v);
        } else {
            value.insert_column(column, v);
        }
    }
    (key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trellis_common::schema::ColumnSchema;
    use trellis_common::types::{DataType, Value};

    fn album_key_schema() -> TableSchema {
        TableSchema::builder("Album")
            .column(ColumnSchema::new("albumId", DataType::Int32))
            .column(ColumnSchema::new("artistId", DataType::Int32))
            .column(ColumnSchema::new("title", DataType::String).nullable(true))
            .column(ColumnSchema::new("releaseYear", DataType::Int32).nullable(true))
            .primary_key(&["albumId", "artistId"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_check_row() {
        let schema = album_key_schema();
        let row = Tuple::new().set("albumId", 1).set("artistId", 2).set("title", "x");
        assert!(check_row(&schema, &row).is_ok());

        let unknown = row.clone().set("genre", "pop");
        assert!(matches!(
            check_row(&schema, &unknown),
            Err(TrellisError::SchemaMismatch { column, .. }) if column == "GENRE"
        ));

        let partial = Tuple::new().set("albumId", 1).set("title", "x");
        assert!(matches!(
            check_row(&schema, &partial),
            Err(TrellisError::KeyIncomplete { column, .. }) if column == "ARTISTID"
        ));
    }

    #[test]
    fn test_check_key() {
        let schema = album_key_schema();
        assert!(check_key(&schema, &Tuple::new().set("albumId", 349).set("artistId", 277)).is_ok());

        let with_value = Tuple::new().set("albumId", 349).set("artistId", 277).set("title", "x");
        assert!(matches!(
            check_key(&schema, &with_value),
            Err(TrellisError::SchemaMismatch { .. })
        ));

        let null_key = Tuple::new().set("albumId", 349).set("artistId", Value::Null);
        assert!(matches!(
            check_key(&schema, &null_key),
            Err(TrellisError::KeyIncomplete { .. })
        ));
    }

    #[test]
    fn test_check_value() {
        let schema = album_key_schema();
        assert!(check_value(&schema, &Tuple::new().set("title", "Technique")).is_ok());
        assert!(check_value(&schema, &Tuple::new()).is_ok());
        assert!(matches!(
            check_value(&schema, &Tuple::new().set("albumId", 1)),
            Err(TrellisError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_split_and_concat() {
        let schema = album_key_schema();
        let row = Tuple::new()
            .set("title", "Technique")
            .set("albumId", 349)
            .set("releaseYear", 1989)
            .set("artistId", 277);

        let (key, value) = split(&schema, row.clone());
        assert_eq!(key, Tuple::new().set("albumId", 349).set("artistId", 277));
        assert_eq!(value, Tuple::new().set("title", "Technique").set("releaseYear", 1989));
        assert_eq!(concat(key, value), row);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<i32>().prop_map(Value::Int32),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    proptest! {
        #[test]
        fn prop_split_inverts_concat(
            album in any::<i32>(),
            artist in any::<i32>(),
            title in proptest::option::of(arb_value()),
            release_year in proptest::option::of(arb_value()),
        ) {
            let schema = album_key_schema();
            let key = Tuple::new().set("albumId", album).set("artistId", artist);
            let mut value = Tuple::new();
            if let Some(t) = title {
                value.insert("title", t);
            }
            if let Some(r) = release_year {
                value.insert("releaseYear", r);
            }

            let (k, v) = split(&schema, concat(key.clone(), value.clone()));
            prop_assert_eq!(k, key);
            prop_assert_eq!(v, value);
        }

        #[test]
        fn prop_concat_inverts_split(
            album in any::<i32>(),
            artist in any::<i32>(),
            title in arb_value(),
        ) {
            let schema = album_key_schema();
            let row = Tuple::new().set("title", title).set("artistId", artist).set("albumId", album);
            let (k, v) = split(&schema, row.clone());
            prop_assert_eq!(concat(k, v), row);
        }
    }
}
