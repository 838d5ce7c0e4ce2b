//! SQL statements and their results.

use std::fmt;

use crate::tuple::Tuple;
use crate::types::Value;

/// A SQL statement with positional parameters.
///
/// Parameters bind to `?` placeholders in order of appearance.
///
/// ```rust
/// use trellis_common::statement::Statement;
///
/// let stmt = Statement::new("SELECT * FROM Album WHERE artistId = ?").bind(277);
/// assert_eq!(stmt.params().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    params: Vec<Value>,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Appends a positional parameter.
    #[must_use]
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Replaces all parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the bound parameters.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

impl From<&str> for Statement {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Statement {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Rows produced by a query.
///
/// A lazy, finite iterator of tuples. It cannot be restarted; run the
/// statement again to read the rows a second time.
pub struct ResultSet {
    columns: Vec<String>,
    rows: Box<dyn Iterator<Item = Tuple> + Send>,
}

impl ResultSet {
    /// Creates a result set over the given rows.
    pub fn new<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: Iterator<Item = Tuple> + Send + 'static,
    {
        Self {
            columns,
            rows: Box::new(rows),
        }
    }

    /// Creates a result set without rows.
    #[must_use]
    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, std::iter::empty())
    }

    /// Returns the projected column names, in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Iterator for ResultSet {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        self.rows.next()
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}
