//! Column values and data types.
//!
//! `Value` is the scalar carried by every `Tuple` cell. `DataType` describes
//! what a column accepts. Widening between integer widths and between float
//! widths is lossless and applied automatically by `Value::coerce_to`; every
//! other type difference is a `TypeMismatch`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TrellisError, TrellisResult};

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Boolean.
    Boolean,
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Variable-length string.
    String,
    /// Variable-length binary.
    Bytes,
}

impl DataType {
    /// Returns the SQL name of the type.
    #[must_use]
    pub const fn sql_name(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int8 => "TINYINT",
            DataType::Int16 => "SMALLINT",
            DataType::Int32 => "INT",
            DataType::Int64 => "BIGINT",
            DataType::Float32 => "REAL",
            DataType::Float64 => "DOUBLE",
            DataType::String => "VARCHAR",
            DataType::Bytes => "VARBINARY",
        }
    }

    /// Returns true for integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Returns true for float types.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Returns true if the type carries a length (strings and binary).
    #[must_use]
    pub const fn has_length(&self) -> bool {
        matches!(self, DataType::String | DataType::Bytes)
    }

    /// Returns the width rank used for widening checks.
    const fn width(&self) -> u8 {
        match self {
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 | DataType::Float32 => 3,
            DataType::Int64 | DataType::Float64 => 4,
            _ => 0,
        }
    }

    /// Returns true if a value of type `from` can be stored in `self`
    /// without loss.
    #[must_use]
    pub fn accepts(&self, from: DataType) -> bool {
        if *self == from {
            return true;
        }
        (self.is_integer() && from.is_integer() || self.is_float() && from.is_float())
            && from.width() <= self.width()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A scalar column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 8-bit signed integer.
    Int8(i8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// String value.
    String(String),
    /// Binary value.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if the value is NULL.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the data type, or `None` for NULL.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int8(_) => Some(DataType::Int8),
            Value::Int16(_) => Some(DataType::Int16),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float32(_) => Some(DataType::Float32),
            Value::Float64(_) => Some(DataType::Float64),
            Value::String(_) => Some(DataType::String),
            Value::Bytes(_) => Some(DataType::Bytes),
        }
    }

    /// Returns the SQL type name, `NULL` for null values.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.data_type().map_or("NULL", |t| t.sql_name())
    }

    /// Tries to get as boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Tries to get any integer as i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Tries to get any number as f64.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Tries to get as string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Tries to get as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Converts the value into the given column type, widening numbers
    /// where that is lossless. NULL passes through unchanged.
    pub fn coerce_to(self, target: DataType) -> TrellisResult<Value> {
        let Some(source) = self.data_type() else {
            return Ok(Value::Null);
        };
        if source == target {
            return Ok(self);
        }
        if !target.accepts(source) {
            return Err(TrellisError::TypeMismatch {
                expected: target.sql_name().to_string(),
                actual: source.sql_name().to_string(),
            });
        }
        let coerced = match target {
            DataType::Int16 => self.as_i64().and_then(|v| i16::try_from(v).ok()).map(Value::Int16),
            DataType::Int32 => self.as_i64().and_then(|v| i32::try_from(v).ok()).map(Value::Int32),
            DataType::Int64 => self.as_i64().map(Value::Int64),
            DataType::Float64 => self.as_f64().map(Value::Float64),
            _ => None,
        };
        coerced.ok_or_else(|| TrellisError::internal(format!("cannot widen {source} to {target}")))
    }

    /// SQL comparison. Numbers compare across widths; NULL and values of
    /// unrelated types are incomparable.
    #[must_use]
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y),
                    _ => None,
                },
            },
        }
    }

    /// Total order over all values, used for ordering keys and sorting.
    ///
    /// NULL sorts first, numbers compare by value across widths, floats use
    /// IEEE total ordering, and otherwise values are grouped by kind.
    #[must_use]
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => return a.cmp(&b),
            _ => {}
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => return a.total_cmp(&b),
            _ => {}
        }
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int8(_)
            | Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Float32(_)
            | Value::Float64(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
        }
    }

    /// Returns the length used for `max_length` checks.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion between a Rust field type and a column `Value`.
///
/// Implemented for the primitive column types and for `Option<T>`, which
/// maps `None` to NULL. Reading NULL into a non-`Option` type fails.
pub trait ColumnValue: Sized {
    /// Converts the field to a column value.
    fn to_value(&self) -> Value;

    /// Converts a column value back to the field type.
    fn from_value(value: &Value) -> TrellisResult<Self>;
}

fn mismatch<T>(expected: DataType, value: &Value) -> TrellisResult<T> {
    Err(TrellisError::TypeMismatch {
        expected: expected.sql_name().to_string(),
        actual: value.type_name().to_string(),
    })
}

macro_rules! impl_column_value_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ColumnValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: &Value) -> TrellisResult<Self> {
                    let widened = value
                        .data_type()
                        .filter(|t| DataType::$variant.accepts(*t))
                        .and_then(|_| value.as_i64())
                        .and_then(|v| <$ty>::try_from(v).ok());
                    match widened {
                        Some(v) => Ok(v),
                        None => mismatch(DataType::$variant, value),
                    }
                }
            }
        )*
    };
}

impl_column_value_int! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
}

impl ColumnValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        value
            .as_bool()
            .map_or_else(|| mismatch(DataType::Boolean, value), Ok)
    }
}

impl ColumnValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float32(*self)
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        match value {
            Value::Float32(v) => Ok(*v),
            other => mismatch(DataType::Float32, other),
        }
    }
}

impl ColumnValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float64(*self)
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        match value {
            Value::Float32(v) => Ok(f64::from(*v)),
            Value::Float64(v) => Ok(*v),
            other => mismatch(DataType::Float64, other),
        }
    }
}

impl ColumnValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        value
            .as_str()
            .map_or_else(|| mismatch(DataType::String, value), |s| Ok(s.to_string()))
    }
}

impl ColumnValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        value
            .as_bytes()
            .map_or_else(|| mismatch(DataType::Bytes, value), |b| Ok(b.to_vec()))
    }
}

impl ColumnValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        Ok(value.clone())
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ColumnValue::to_value)
    }

    fn from_value(value: &Value) -> TrellisResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
