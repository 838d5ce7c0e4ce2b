//! Mappings bound to a table schema.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::{ColumnSchema, TableSchema};
use trellis_common::tuple::Tuple;

use super::{Mapped, ObjectMapping};

/// Which columns of a table a binding covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// All columns; every key column must be mapped.
    Row,
    /// Key columns only; every key column must be mapped.
    Key,
    /// Value columns only.
    Value,
}

impl Scope {
    fn covers(self, column: &ColumnSchema) -> bool {
        match self {
            Scope::Row => true,
            Scope::Key => column.is_key(),
            Scope::Value => !column.is_key(),
        }
    }

    fn requires_key(self) -> bool {
        matches!(self, Scope::Row | Scope::Key)
    }
}

/// An [`ObjectMapping`] resolved against one table schema.
///
/// Fields whose column is not in the schema, or outside the scope, are
/// ignored. Columns without a field are dropped when reading.
pub struct BoundMapping<T> {
    mapping: Arc<ObjectMapping<T>>,
    /// `(field index, column)` pairs in field order.
    slots: Vec<(usize, String)>,
    scope: Scope,
}

impl<T: Mapped> BoundMapping<T> {
    /// Binds a mapping to `schema` for `scope`.
    ///
    /// Fails with `Mapping` if two fields name the same column, if a
    /// required key column has no field, or if a scalar mapping does not
    /// find exactly one column in scope.
    pub fn bind(
        mapping: Arc<ObjectMapping<T>>,
        schema: &TableSchema,
        scope: Scope,
    ) -> TrellisResult<Self> {
        let in_scope: Vec<&ColumnSchema> =
            schema.columns().iter().filter(|c| scope.covers(c)).collect();

        let slots = if mapping.is_scalar() {
            match in_scope.as_slice() {
                [column] => vec![(0, column.name.clone())],
                _ => {
                    return Err(TrellisError::mapping::<T>(format!(
                        "a scalar maps onto exactly one column, but {} has {} {} column(s)",
                        schema.name(),
                        in_scope.len(),
                        scope_label(scope),
                    )))
                }
            }
        } else {
            let mut seen = HashSet::new();
            let mut slots = Vec::new();
            for (i, field) in mapping.fields().iter().enumerate() {
                let Some(column) = field.column.as_deref() else {
                    continue;
                };
                if !seen.insert(column) {
                    return Err(TrellisError::mapping::<T>(format!(
                        "column {column} is mapped by more than one field"
                    )));
                }
                if in_scope.iter().any(|c| c.name == column) {
                    slots.push((i, column.to_string()));
                }
            }
            slots
        };

        if scope.requires_key() {
            for key in schema.key_columns() {
                if !slots.iter().any(|(_, c)| *c == key.name) {
                    return Err(TrellisError::mapping::<T>(format!(
                        "key column {} of {} has no mapped field",
                        key.name,
                        schema.name()
                    )));
                }
            }
        }

        Ok(Self {
            mapping,
            slots,
            scope,
        })
    }
}

impl<T: Mapped> BoundMapping<T> {
    /// Returns the bound scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the bound column names in field order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(_, c)| c.as_str())
    }

    /// Converts an object to a tuple of its bound columns.
    pub fn to_tuple(&self, object: &T) -> Tuple {
        let fields = self.mapping.fields();
        let mut tuple = Tuple::with_capacity(self.slots.len());
        for (i, column) in &self.slots {
            tuple.insert_column(column.clone(), fields[*i].read(object));
        }
        tuple
    }

    /// Builds an object from a tuple.
    ///
    /// Starts from `T::default()` and fills every bound field whose column
    /// is present in the tuple.
    pub fn from_tuple(&self, tuple: &Tuple) -> TrellisResult<T> {
        let fields = self.mapping.fields();
        let mut object = T::default();
        for (i, column) in &self.slots {
            if let Some(value) = tuple.column(column) {
                fields[*i].write(&mut object, value)?;
            }
        }
        Ok(object)
    }
}

fn scope_label(scope: Scope) -> &'static str {
    match scope {
        Scope::Row => "row",
        Scope::Key => "key",
        Scope::Value => "value",
    }
}

impl<T> fmt::Debug for BoundMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMapping")
            .field("type", &std::any::type_name::<T>())
            .field("scope", &self.scope)
            .field("slots", &self.slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tests::Album;
    use proptest::prelude::*;
    use trellis_common::types::{DataType, Value};

    fn album_schema() -> TableSchema {
        TableSchema::builder("Album")
            .column(ColumnSchema::new("albumId", DataType::Int32))
            .column(ColumnSchema::new("title", DataType::String).max_length(25))
            .column(ColumnSchema::new("artistId", DataType::Int32))
            .column(ColumnSchema::new("releaseYear", DataType::Int32).nullable(true))
            .primary_key(&["albumId", "artistId"])
            .build()
            .unwrap()
    }

    #[derive(Debug, Default)]
    struct Twice {
        a: i32,
        b: i32,
    }

    impl Mapped for Twice {
        fn mapping() -> ObjectMapping<Self> {
            ObjectMapping::builder()
                .column("albumId", |t: &Twice| &t.a, |t: &mut Twice| &mut t.a)
                .column("ALBUMID", |t: &Twice| &t.b, |t: &mut Twice| &mut t.b)
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct TitleOnly {
        title: String,
    }

    impl Mapped for TitleOnly {
        fn mapping() -> ObjectMapping<Self> {
            ObjectMapping::builder()
                .column("title", |t: &TitleOnly| &t.title, |t: &mut TitleOnly| &mut t.title)
                .build()
        }
    }

    #[test]
    fn test_bind_row_scope() {
        let bound = BoundMapping::bind(Arc::new(Album::mapping()), &album_schema(), Scope::Row).unwrap();
        assert_eq!(
            bound.columns().collect::<Vec<_>>(),
            ["ALBUMID", "TITLE", "ARTISTID", "RELEASEYEAR"]
        );
        assert_eq!(bound.scope(), Scope::Row);
    }

    #[test]
    fn test_bind_key_and_value_scopes() {
        let mapping = Arc::new(Album::mapping());
        let key = BoundMapping::bind(Arc::clone(&mapping), &album_schema(), Scope::Key).unwrap();
        assert_eq!(key.columns().collect::<Vec<_>>(), ["ALBUMID", "ARTISTID"]);

        let value = BoundMapping::bind(mapping, &album_schema(), Scope::Value).unwrap();
        assert_eq!(value.columns().collect::<Vec<_>>(), ["TITLE", "RELEASEYEAR"]);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = BoundMapping::bind(Arc::new(Twice::mapping()), &album_schema(), Scope::Row).unwrap_err();
        assert!(matches!(err, TrellisError::Mapping { .. }));
    }

    #[test]
    fn test_missing_key_field_rejected() {
        let mapping = Arc::new(TitleOnly::mapping());
        let err = BoundMapping::bind(Arc::clone(&mapping), &album_schema(), Scope::Row).unwrap_err();
        assert!(err.to_string().contains("ALBUMID"));

        // A value-only binding needs no key field.
        assert!(BoundMapping::bind(mapping, &album_schema(), Scope::Value).is_ok());
    }

    #[test]
    fn test_scalar_binding() {
        let person = TableSchema::builder("Person2")
            .column(ColumnSchema::new("id", DataType::Int32))
            .column(ColumnSchema::new("name", DataType::String).nullable(true))
            .primary_key(&["id"])
            .build()
            .unwrap();

        let key = BoundMapping::bind(Arc::new(i32::mapping()), &person, Scope::Key).unwrap();
        assert_eq!(key.to_tuple(&5), Tuple::new().set("id", 5));

        let value = BoundMapping::bind(Arc::new(String::mapping()), &person, Scope::Value).unwrap();
        assert_eq!(value.to_tuple(&"Joe".to_string()), Tuple::new().set("name", "Joe"));

        let err = BoundMapping::bind(Arc::new(i32::mapping()), &person, Scope::Row).unwrap_err();
        assert!(matches!(err, TrellisError::Mapping { .. }));
    }

    #[test]
    fn test_round_trip_keeps_unmapped_defaults() {
        let bound = BoundMapping::bind(Arc::new(Album::mapping()), &album_schema(), Scope::Row).unwrap();
        let album = Album {
            album_id: 348,
            title: "First Light".into(),
            artist_id: 276,
            release_year: Some(2023),
            note: "not stored".into(),
        };

        let tuple = bound.to_tuple(&album);
        assert_eq!(tuple.len(), 4);
        assert_eq!(tuple.get("releaseYear"), Some(&Value::Int32(2023)));

        let back = bound.from_tuple(&tuple.set("extra", 1)).unwrap();
        assert_eq!(back.album_id, 348);
        assert_eq!(back.title, "First Light");
        assert_eq!(back.note, "");
    }

    fn arb_album() -> impl Strategy<Value = Album> {
        (
            any::<i32>(),
            "[A-Za-z0-9 /]{0,25}",
            any::<i32>(),
            proptest::option::of(any::<i32>()),
        )
            .prop_map(|(album_id, title, artist_id, release_year)| Album {
                album_id,
                title,
                artist_id,
                release_year,
                note: String::new(),
            })
    }

    proptest! {
        #[test]
        fn prop_row_round_trip(album in arb_album()) {
            let bound = BoundMapping::bind(Arc::new(Album::mapping()), &album_schema(), Scope::Row).unwrap();
            let tuple = bound.to_tuple(&album);
            prop_assert_eq!(tuple.len(), 4);
            prop_assert_eq!(bound.from_tuple(&tuple).unwrap(), album);
        }

        #[test]
        fn prop_key_and_value_round_trip(album in arb_album()) {
            let mapping = Arc::new(Album::mapping());
            let key = BoundMapping::bind(Arc::clone(&mapping), &album_schema(), Scope::Key).unwrap();
            let value = BoundMapping::bind(mapping, &album_schema(), Scope::Value).unwrap();

            let from_key = key.from_tuple(&key.to_tuple(&album)).unwrap();
            prop_assert_eq!((from_key.album_id, from_key.artist_id), (album.album_id, album.artist_id));

            let from_value = value.from_tuple(&value.to_tuple(&album)).unwrap();
            prop_assert_eq!(&from_value.title, &album.title);
            prop_assert_eq!(from_value.release_year, album.release_year);
        }
    }
}
