//! Object mapping.
//!
//! An [`ObjectMapping<T>`] declares which fields of a Rust type correspond to
//! which table columns. Mappings are written once per type, usually in the
//! type's [`Mapped`] implementation, and bound to a concrete table schema
//! when a view is created:
//!
//! ```text
//!   ObjectMapping<Album>          TableSchema ALBUM
//!   ┌───────────────────┐         ┌──────────────────────┐
//!   │ albumId  → field  │──bind──▶│ ALBUMID  INT   (key) │
//!   │ title    → field  │         │ TITLE    VARCHAR     │
//!   │ artistId → field  │         │ ARTISTID INT   (key) │
//!   └───────────────────┘         │ RELEASEYEAR INT      │
//!                                 └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use trellis_client::mapping::{Mapped, ObjectMapping};
//!
//! #[derive(Debug, Default)]
//! struct Artist {
//!     artist_id: i32,
//!     name: Option<String>,
//! }
//!
//! impl Mapped for Artist {
//!     fn mapping() -> ObjectMapping<Self> {
//!         ObjectMapping::builder()
//!             .column("artistId", |a: &Artist| &a.artist_id, |a: &mut Artist| &mut a.artist_id)
//!             .column("name", |a: &Artist| &a.name, |a: &mut Artist| &mut a.name)
//!             .build()
//!     }
//! }
//!
//! assert_eq!(Artist::mapping().columns().collect::<Vec<_>>(), ["ARTISTID", "NAME"]);
//! ```

mod bound;

pub use bound::{BoundMapping, Scope};

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::types::{normalize_identifier, ColumnValue, Value};

type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, &Value) -> TrellisResult<()> + Send + Sync>;

/// One mapped field.
pub(crate) struct FieldMapping<T> {
    /// Normalised column name; `None` for a scalar mapping.
    pub(crate) column: Option<String>,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> FieldMapping<T> {
    pub(crate) fn read(&self, object: &T) -> Value {
        (self.get)(object)
    }

    pub(crate) fn write(&self, object: &mut T, value: &Value) -> TrellisResult<()> {
        (self.set)(object, value)
    }
}

/// Association between the fields of `T` and column names.
pub struct ObjectMapping<T> {
    fields: Vec<FieldMapping<T>>,
}

impl<T: 'static> ObjectMapping<T> {
    /// Starts a field-by-field mapping.
    pub fn builder() -> ObjectMappingBuilder<T> {
        ObjectMappingBuilder { fields: Vec::new() }
    }

    /// Maps the whole value onto the single column of the bound scope.
    pub fn scalar() -> Self
    where
        T: ColumnValue,
    {
        Self {
            fields: vec![FieldMapping {
                column: None,
                get: Box::new(|v: &T| v.to_value()),
                set: Box::new(|v: &mut T, value: &Value| {
                    *v = T::from_value(value)
                        .map_err(|e| TrellisError::mapping::<T>(conversion_failure(value, &e)))?;
                    Ok(())
                }),
            }],
        }
    }
}

impl<T> ObjectMapping<T> {
    /// Returns true for a scalar mapping.
    pub fn is_scalar(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].column.is_none()
    }

    /// Returns the mapped column names in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| f.column.as_deref())
    }

    /// Returns the number of mapped fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is mapped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> &[FieldMapping<T>] {
        &self.fields
    }
}

impl<T> fmt::Debug for ObjectMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMapping")
            .field("type", &std::any::type_name::<T>())
            .field("columns", &self.columns().collect::<Vec<_>>())
            .field("scalar", &self.is_scalar())
            .finish()
    }
}

/// Builder for [`ObjectMapping`].
pub struct ObjectMappingBuilder<T> {
    fields: Vec<FieldMapping<T>>,
}

impl<T: 'static> ObjectMappingBuilder<T> {
    /// Maps a field to a column.
    ///
    /// `get` and `get_mut` project the field out of the object. The column
    /// name follows identifier rules: `"albumId"` maps to `ALBUMID`, a
    /// quoted `"\"albumId\""` keeps its case.
    pub fn column<F, G, M>(mut self, name: &str, get: G, get_mut: M) -> Self
    where
        F: ColumnValue + 'static,
        G: for<'a> Fn(&'a T) -> &'a F + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut F + Send + Sync + 'static,
    {
        let column = normalize_identifier(name);
        let label = column.clone();
        self.fields.push(FieldMapping {
            column: Some(column),
            get: Box::new(move |object: &T| get(object).to_value()),
            set: Box::new(move |object: &mut T, value: &Value| {
                *get_mut(object) = F::from_value(value).map_err(|e| {
                    TrellisError::mapping::<T>(format!(
                        "column {label}: {}",
                        conversion_failure(value, &e)
                    ))
                })?;
                Ok(())
            }),
        });
        self
    }

    /// Finishes the mapping.
    pub fn build(self) -> ObjectMapping<T> {
        ObjectMapping {
            fields: self.fields,
        }
    }
}

fn conversion_failure(value: &Value, cause: &TrellisError) -> String {
    if value.is_null() {
        "NULL cannot be read into a non-optional field".to_string()
    } else {
        cause.to_string()
    }
}

/// A type with a declared column mapping.
///
/// Fields without a corresponding column keep their `Default` value when an
/// object is read back.
pub trait Mapped: Default + Send + Sync + 'static {
    /// Returns the mapping of this type.
    fn mapping() -> ObjectMapping<Self>;
}

macro_rules! impl_scalar_mapped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Mapped for $ty {
                fn mapping() -> ObjectMapping<Self> {
                    ObjectMapping::scalar()
                }
            }
        )*
    };
}

impl_scalar_mapped!(bool, i8, i16, i32, i64, f32, f64, String, Vec<u8>);

/// Per-type cache of object mappings.
#[derive(Default)]
pub(crate) struct MappingCache {
    entries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl MappingCache {
    /// Returns the mapping of `T`, building it on first use.
    pub(crate) fn get<T: Mapped>(&self) -> Arc<ObjectMapping<T>> {
        let id = TypeId::of::<T>();
        if let Some(mapping) = self.lookup::<T>(id) {
            return mapping;
        }
        let mapping = Arc::new(T::mapping());
        self.entries
            .write()
            .entry(id)
            .or_insert_with(|| Arc::clone(&mapping) as Arc<dyn Any + Send + Sync>);
        mapping
    }

    fn lookup<T: Mapped>(&self, id: TypeId) -> Option<Arc<ObjectMapping<T>>> {
        let entry = Arc::clone(self.entries.read().get(&id)?);
        entry.downcast::<ObjectMapping<T>>().ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}

impl fmt::Debug for MappingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingCache").field("types", &self.len()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    pub(crate) struct Album {
        pub(crate) album_id: i32,
        pub(crate) title: String,
        pub(crate) artist_id: i32,
        pub(crate) release_year: Option<i32>,
        pub(crate) note: String,
    }

    impl Mapped for Album {
        fn mapping() -> ObjectMapping<Self> {
            ObjectMapping::builder()
                .column("albumId", |a: &Album| &a.album_id, |a: &mut Album| &mut a.album_id)
                .column("title", |a: &Album| &a.title, |a: &mut Album| &mut a.title)
                .column("artistId", |a: &Album| &a.artist_id, |a: &mut Album| &mut a.artist_id)
                .column("releaseYear", |a: &Album| &a.release_year, |a: &mut Album| &mut a.release_year)
                .build()
        }
    }

    #[test]
    fn test_builder_normalises_columns() {
        let mapping = Album::mapping();
        assert_eq!(
            mapping.columns().collect::<Vec<_>>(),
            ["ALBUMID", "TITLE", "ARTISTID", "RELEASEYEAR"]
        );
        assert_eq!(mapping.len(), 4);
        assert!(!mapping.is_scalar());
    }

    #[test]
    fn test_field_read_write() {
        let mapping = Album::mapping();
        let mut album = Album::default();
        let title = &mapping.fields()[1];
        title.write(&mut album, &Value::from("Technique")).unwrap();
        assert_eq!(title.read(&album), Value::from("Technique"));

        let release_year = &mapping.fields()[3];
        release_year.write(&mut album, &Value::Null).unwrap();
        assert_eq!(album.release_year, None);
    }

    #[test]
    fn test_null_into_required_field_is_mapping_error() {
        let mapping = Album::mapping();
        let mut album = Album::default();
        let err = mapping.fields()[1].write(&mut album, &Value::Null).unwrap_err();
        assert!(matches!(err, TrellisError::Mapping { .. }));
        assert!(err.to_string().contains("TITLE"));
    }

    #[test]
    fn test_scalar_mapping() {
        let mapping = <i32 as Mapped>::mapping();
        assert!(mapping.is_scalar());
        assert_eq!(mapping.columns().count(), 0);

        let mut v = 0i32;
        mapping.fields()[0].write(&mut v, &Value::Int16(5)).unwrap();
        assert_eq!(v, 5);
        assert!(mapping.fields()[0].write(&mut v, &Value::Null).is_err());
    }

    #[test]
    fn test_mapping_cache_reuses_instances() {
        let cache = MappingCache::default();
        let a = cache.get::<Album>();
        let b = cache.get::<Album>();
        assert!(Arc::ptr_eq(&a, &b));
        cache.get::<String>();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
