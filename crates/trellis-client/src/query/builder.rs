//! Query builder for fluent SQL construction.

use trellis_common::statement::Statement;
use trellis_common::types::Value;

/// A part of the query being built.
#[derive(Debug, Clone)]
enum QueryPart {
    /// Raw SQL text.
    Sql(String),
    /// A parameter placeholder.
    Param(Value),
}

/// A fluent `SELECT` builder.
///
/// Values are never spliced into the text; each one becomes a `?`
/// placeholder with a bound parameter.
///
/// ```rust
/// use trellis_client::query::QueryBuilder;
///
/// let statement = QueryBuilder::new()
///     .select(&["title"])
///     .from("Album")
///     .where_eq("artistId", 277)
///     .order_by("title")
///     .limit(10)
///     .build();
///
/// assert_eq!(statement.text(), "SELECT title FROM Album WHERE artistId = ? ORDER BY title LIMIT 10");
/// assert_eq!(statement.params().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    parts: Vec<QueryPart>,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw SQL to the query.
    pub fn sql(mut self, sql: impl AsRef<str>) -> Self {
        self.parts.push(QueryPart::Sql(sql.as_ref().to_string()));
        self
    }

    /// Appends a parameter to the query.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.parts.push(QueryPart::Param(value.into()));
        self
    }

    /// Appends SELECT clause.
    pub fn select(self, columns: &[&str]) -> Self {
        self.sql("SELECT ").sql(columns.join(", "))
    }

    /// Appends SELECT * clause.
    pub fn select_all(self) -> Self {
        self.sql("SELECT *")
    }

    /// Appends FROM clause.
    pub fn from(self, table: &str) -> Self {
        self.sql(" FROM ").sql(table)
    }

    /// Appends WHERE clause.
    pub fn where_clause(self, condition: &str) -> Self {
        self.sql(" WHERE ").sql(condition)
    }

    /// Appends WHERE with equality condition.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.sql(" WHERE ").sql(column).sql(" = ").bind(value)
    }

    /// Appends AND with equality condition.
    pub fn and_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.sql(" AND ").sql(column).sql(" = ").bind(value)
    }

    /// Appends OR with equality condition.
    pub fn or_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.sql(" OR ").sql(column).sql(" = ").bind(value)
    }

    /// Appends ORDER BY clause.
    pub fn order_by(self, column: &str) -> Self {
        self.sql(" ORDER BY ").sql(column)
    }

    /// Appends ORDER BY DESC clause.
    pub fn order_by_desc(self, column: &str) -> Self {
        self.sql(" ORDER BY ").sql(column).sql(" DESC")
    }

    /// Appends LIMIT clause.
    pub fn limit(self, limit: u64) -> Self {
        self.sql(" LIMIT ").sql(limit.to_string())
    }

    /// Appends OFFSET clause.
    pub fn offset(self, offset: u64) -> Self {
        self.sql(" OFFSET ").sql(offset.to_string())
    }

    /// Builds the statement.
    pub fn build(&self) -> Statement {
        let mut text = String::new();
        let mut params = Vec::new();
        for part in &self.parts {
            match part {
                QueryPart::Sql(s) => text.push_str(s),
                QueryPart::Param(v) => {
                    text.push('?');
                    params.push(v.clone());
                }
            }
        }
        Statement::new(text).with_params(params)
    }
}

impl From<QueryBuilder> for Statement {
    fn from(builder: QueryBuilder) -> Self {
        builder.build()
    }
}
