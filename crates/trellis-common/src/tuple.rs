//! Dynamically-keyed rows.
//!
//! A `Tuple` is an ordered mapping from column name to `Value`. It is used
//! both as a full row and as a partial, key-only row. Names passed to the
//! public accessors go through SQL identifier normalisation, so `artistId`,
//! `ARTISTID` and `ArtistId` address the same column while `"artistId"`
//! addresses a case-sensitive one.
//!
//! # Example
//!
//! ```rust
//! use trellis_common::tuple::Tuple;
//! use trellis_common::types::Value;
//!
//! let artist = Tuple::new().set("artistId", 277).set("name", "New Order");
//!
//! assert_eq!(artist.get("ARTISTID"), Some(&Value::Int32(277)));
//! assert_eq!(artist.get("genre"), None);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::TrellisResult;
use crate::types::{normalize_identifier, ColumnValue, Value};

/// Ordered column name to value mapping.
///
/// Column names are unique after normalisation. An absent column is
/// distinct from a column explicitly set to `Value::Null`. Equality compares
/// content and ignores insertion order.
#[derive(Clone, Default)]
pub struct Tuple {
    names: Vec<String>,
    values: Vec<Value>,
    index: HashMap<String, usize>,
}

impl Tuple {
    /// Creates an empty tuple.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tuple with room for `capacity` columns.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Sets a column and returns the tuple, for chained construction.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a column in place, returning the previous value if any.
    ///
    /// Replacing an existing column keeps its position.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.insert_column(normalize_identifier(name), value.into())
    }

    /// Sets a column by its already-normalised name.
    pub fn insert_column(&mut self, column: String, value: Value) -> Option<Value> {
        if let Some(&pos) = self.index.get(&column) {
            return Some(std::mem::replace(&mut self.values[pos], value));
        }
        self.index.insert(column.clone(), self.names.len());
        self.names.push(column);
        self.values.push(value);
        None
    }

    /// Returns the value of a column.
    ///
    /// `None` means the column is absent; `Some(&Value::Null)` means it was
    /// explicitly set to null.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.column(&normalize_identifier(name))
    }

    /// Returns the value of a column by its already-normalised name.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<&Value> {
        self.index.get(column).map(|&pos| &self.values[pos])
    }

    /// Reads a column as a Rust type.
    ///
    /// Returns `Ok(None)` when the column is absent.
    pub fn get_as<T: ColumnValue>(&self, name: &str) -> TrellisResult<Option<T>> {
        self.get(name).map(T::from_value).transpose()
    }

    /// Returns true if the column is present (possibly null).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contains_column(&normalize_identifier(name))
    }

    /// Returns true if the already-normalised column is present.
    #[must_use]
    pub fn contains_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Removes a column, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let column = normalize_identifier(name);
        let pos = self.index.remove(&column)?;
        self.names.remove(pos);
        let value = self.values.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// Returns the normalised column names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Returns the values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Iterates over `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.column(name) == Some(value))
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

impl<S: AsRef<str>, V: Into<Value>> FromIterator<(S, V)> for Tuple {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut tuple = Tuple::new();
        for (name, value) in iter {
            tuple.insert(name.as_ref(), value);
        }
        tuple
    }
}

impl IntoIterator for Tuple {
    type Item = (String, Value);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<String>, std::vec::IntoIter<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.into_iter().zip(self.values)
    }
}
