//! Single-table `SELECT` support.
//!
//! Statements are parsed with the `sqlparser` crate and resolved against the
//! schema of the queried table.
//!
//! # Supported SQL
//!
//! ```text
//! SELECT <* | column [AS alias], ...> FROM <table>
//!     [WHERE <predicate>]
//!     [ORDER BY column [ASC | DESC], ...]
//!     [LIMIT n] [OFFSET n]
//! ```
//!
//! Predicates use `=, <>, !=, <, <=, >, >=, AND, OR, NOT, IS [NOT] NULL`
//! and parentheses. Positional parameters are written `?` (bound in order)
//! or `$n` (bound to the n-th parameter).

mod expr;

pub use expr::{CompareOp, ScalarExpr};

use std::sync::Arc;

use sqlparser::ast::{
    BinaryOperator, Expr, Ident, ObjectName, OrderByExpr, SelectItem, SetExpr,
    Statement as SqlStatement, TableFactor, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use trellis_common::error::{TrellisError, TrellisResult};
use trellis_common::schema::TableSchema;
use trellis_common::statement::{ResultSet, Statement};
use trellis_common::tuple::Tuple;
use trellis_common::types::Value;

/// A resolved `SELECT` over one table.
#[derive(Debug, Clone)]
pub struct SelectPlan {
    table: String,
    columns: Vec<String>,
    projection: Vec<usize>,
    filter: Option<ScalarExpr>,
    order_by: Vec<(usize, bool)>,
    limit: Option<usize>,
    offset: usize,
}

impl SelectPlan {
    /// Parses and resolves a statement.
    ///
    /// `lookup` returns the schema of the named (normalised) table.
    pub fn parse(
        statement: &Statement,
        lookup: impl FnOnce(&str) -> TrellisResult<Arc<TableSchema>>,
    ) -> TrellisResult<Self> {
        let mut parsed = Parser::parse_sql(&GenericDialect {}, statement.text()).map_err(|e| {
            TrellisError::SyntaxError {
                message: e.to_string(),
            }
        })?;
        if parsed.len() != 1 {
            return Err(TrellisError::SyntaxError {
                message: format!("expected one statement, found {}", parsed.len()),
            });
        }

        let SqlStatement::Query(query) = parsed.remove(0) else {
            return Err(TrellisError::unsupported("only SELECT statements are supported"));
        };
        let query = *query;
        if query.with.is_some() {
            return Err(TrellisError::unsupported("WITH"));
        }
        let SetExpr::Select(select) = *query.body else {
            return Err(TrellisError::unsupported("set operations and VALUES"));
        };
        if select.distinct.is_some() {
            return Err(TrellisError::unsupported("DISTINCT"));
        }
        if select.having.is_some() {
            return Err(TrellisError::unsupported("HAVING"));
        }
        if select.from.len() != 1 || !select.from[0].joins.is_empty() {
            return Err(TrellisError::unsupported("queries over more than one table"));
        }

        let table_name = match &select.from[0].relation {
            TableFactor::Table { name, .. } => object_name(name),
            _ => return Err(TrellisError::unsupported("derived tables")),
        };
        let schema = lookup(&table_name)?;

        let mut resolver = Resolver {
            schema: &schema,
            params: statement.params(),
            next_param: 0,
            max_param: 0,
        };

        let mut columns = Vec::new();
        let mut projection = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::Wildcard(_) => {
                    for (i, column) in schema.columns().iter().enumerate() {
                        columns.push(column.name.clone());
                        projection.push(i);
                    }
                }
                SelectItem::UnnamedExpr(expr) => {
                    let (name, i) = resolver.projected_column(expr)?;
                    columns.push(name);
                    projection.push(i);
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let (_, i) = resolver.projected_column(expr)?;
                    columns.push(ident(alias));
                    projection.push(i);
                }
                SelectItem::QualifiedWildcard(..) => {
                    return Err(TrellisError::unsupported("qualified wildcard"));
                }
            }
        }

        let filter = select
            .selection
            .as_ref()
            .map(|e| resolver.expr(e))
            .transpose()?;

        let order_by = query
            .order_by
            .iter()
            .map(|o| resolver.order_by(o))
            .collect::<TrellisResult<Vec<_>>>()?;

        let limit = query.limit.as_ref().map(|e| resolver.count(e)).transpose()?;
        let offset = query
            .offset
            .as_ref()
            .map(|o| resolver.count(&o.value))
            .transpose()?
            .unwrap_or(0);

        resolver.check_params()?;

        Ok(Self {
            table: table_name,
            columns,
            projection,
            filter,
            order_by,
            limit,
            offset,
        })
    }

    /// Returns the queried table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the output column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Runs the plan over a snapshot of the table rows.
    ///
    /// Without `ORDER BY` rows are filtered and projected lazily as the
    /// result set is consumed.
    pub fn execute(self, rows: Vec<Vec<Value>>) -> ResultSet {
        let Self {
            columns,
            projection,
            filter,
            order_by,
            limit,
            offset,
            ..
        } = self;

        let filtered = rows
            .into_iter()
            .filter(move |row| filter.as_ref().map_or(true, |f| f.matches(row)));

        let ordered: Box<dyn Iterator<Item = Vec<Value>> + Send> = if order_by.is_empty() {
            Box::new(filtered)
        } else {
            let mut sorted: Vec<Vec<Value>> = filtered.collect();
            sorted.sort_by(|a, b| {
                for &(i, asc) in &order_by {
                    let ord = cell(a, i).total_cmp(&cell(b, i));
                    if ord.is_ne() {
                        return if asc { ord } else { ord.reverse() };
                    }
                }
                std::cmp::Ordering::Equal
            });
            Box::new(sorted.into_iter())
        };

        let names = columns.clone();
        let rows = ordered
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(move |row| {
                let mut tuple = Tuple::with_capacity(projection.len());
                for (name, &i) in names.iter().zip(&projection) {
                    tuple.insert_column(name.clone(), cell(&row, i));
                }
                tuple
            });

        ResultSet::new(columns, rows)
    }
}

fn cell(row: &[Value], i: usize) -> Value {
    row.get(i).cloned().unwrap_or(Value::Null)
}

fn ident(ident: &Ident) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        ident.value.to_ascii_uppercase()
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0.last().map(ident).unwrap_or_default()
}

/// Resolves AST nodes against one schema and the bound parameters.
struct Resolver<'a> {
    schema: &'a TableSchema,
    params: &'a [Value],
    next_param: usize,
    max_param: usize,
}

impl Resolver<'_> {
    fn column(&self, name: String) -> TrellisResult<usize> {
        self.schema.column_index(&name).ok_or_else(|| {
            TrellisError::query(format!(
                "column {name} does not exist in table {}",
                self.schema.name()
            ))
        })
    }

    fn column_ref(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Identifier(id) => Some(ident(id)),
            Expr::CompoundIdentifier(parts) => parts.last().map(ident),
            Expr::Nested(inner) => self.column_ref(inner),
            _ => None,
        }
    }

    fn projected_column(&self, expr: &Expr) -> TrellisResult<(String, usize)> {
        let name = self
            .column_ref(expr)
            .ok_or_else(|| TrellisError::unsupported(format!("projection {expr}")))?;
        let i = self.column(name.clone())?;
        Ok((name, i))
    }

    fn order_by(&self, order: &OrderByExpr) -> TrellisResult<(usize, bool)> {
        let name = self
            .column_ref(&order.expr)
            .ok_or_else(|| TrellisError::unsupported(format!("ORDER BY {}", order.expr)))?;
        Ok((self.column(name)?, order.asc.unwrap_or(true)))
    }

    fn count(&mut self, expr: &Expr) -> TrellisResult<usize> {
        match self.expr(expr)? {
            ScalarExpr::Literal(v) => v
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| TrellisError::query(format!("invalid row count {v}"))),
            _ => Err(TrellisError::query("row count must be a constant")),
        }
    }

    fn param(&mut self, placeholder: &str) -> TrellisResult<Value> {
        let index = if placeholder == "?" {
            self.next_param += 1;
            self.next_param - 1
        } else {
            placeholder
                .trim_start_matches(['$', '?'])
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| {
                    TrellisError::query(format!("invalid placeholder {placeholder}"))
                })?
        };
        self.max_param = self.max_param.max(index + 1);
        self.params.get(index).cloned().ok_or_else(|| {
            TrellisError::query(format!(
                "placeholder {} has no bound parameter ({} bound)",
                index + 1,
                self.params.len()
            ))
        })
    }

    fn check_params(&self) -> TrellisResult<()> {
        if self.params.len() > self.max_param {
            return Err(TrellisError::query(format!(
                "statement uses {} parameters but {} were bound",
                self.max_param,
                self.params.len()
            )));
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> TrellisResult<ScalarExpr> {
        match expr {
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                let name = self
                    .column_ref(expr)
                    .ok_or_else(|| TrellisError::internal("unresolved identifier"))?;
                Ok(ScalarExpr::Column(self.column(name)?))
            }
            Expr::Value(v) => Ok(ScalarExpr::Literal(self.literal(v)?)),
            Expr::Nested(inner) => self.expr(inner),
            Expr::IsNull(inner) => Ok(ScalarExpr::IsNull {
                expr: Box::new(self.expr(inner)?),
                negated: false,
            }),
            Expr::IsNotNull(inner) => Ok(ScalarExpr::IsNull {
                expr: Box::new(self.expr(inner)?),
                negated: true,
            }),
            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => Ok(ScalarExpr::Not(Box::new(self.expr(expr)?))),
                UnaryOperator::Minus => match self.expr(expr)? {
                    ScalarExpr::Literal(v) => Ok(ScalarExpr::Literal(negate(v)?)),
                    _ => Err(TrellisError::unsupported("negation of a column")),
                },
                UnaryOperator::Plus => self.expr(expr),
                other => Err(TrellisError::unsupported(format!("operator {other}"))),
            },
            Expr::BinaryOp { left, op, right } => {
                let left = Box::new(self.expr(left)?);
                let right = Box::new(self.expr(right)?);
                let op = match op {
                    BinaryOperator::And => return Ok(ScalarExpr::And(left, right)),
                    BinaryOperator::Or => return Ok(ScalarExpr::Or(left, right)),
                    BinaryOperator::Eq => CompareOp::Eq,
                    BinaryOperator::NotEq => CompareOp::NotEq,
                    BinaryOperator::Lt => CompareOp::Lt,
                    BinaryOperator::LtEq => CompareOp::LtEq,
                    BinaryOperator::Gt => CompareOp::Gt,
                    BinaryOperator::GtEq => CompareOp::GtEq,
                    other => return Err(TrellisError::unsupported(format!("operator {other}"))),
                };
                Ok(ScalarExpr::Compare { op, left, right })
            }
            other => Err(TrellisError::unsupported(format!("expression {other}"))),
        }
    }

    fn literal(&mut self, value: &SqlValue) -> TrellisResult<Value> {
        match value {
            SqlValue::Null => Ok(Value::Null),
            SqlValue::Boolean(b) => Ok(Value::Boolean(*b)),
            SqlValue::SingleQuotedString(s) => Ok(Value::String(s.clone())),
            SqlValue::Number(n, _) => parse_number(n),
            SqlValue::Placeholder(p) => self.param(p),
            other => Err(TrellisError::unsupported(format!("literal {other}"))),
        }
    }
}

fn parse_number(text: &str) -> TrellisResult<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(i32::try_from(n).map_or(Value::Int64(n), Value::Int32));
    }
    text.parse::<f64>()
        .map(Value::Float64)
        .map_err(|_| TrellisError::SyntaxError {
            message: format!("invalid number {text}"),
        })
}

fn negate(value: Value) -> TrellisResult<Value> {
    let overflow = || TrellisError::query("numeric overflow");
    match value {
        Value::Int8(v) => v.checked_neg().map(Value::Int8).ok_or_else(overflow),
        Value::Int16(v) => v.checked_neg().map(Value::Int16).ok_or_else(overflow),
        Value::Int32(v) => v.checked_neg().map(Value::Int32).ok_or_else(overflow),
        Value::Int64(v) => v.checked_neg().map(Value::Int64).ok_or_else(overflow),
        Value::Float32(v) => Ok(Value::Float32(-v)),
        Value::Float64(v) => Ok(Value::Float64(-v)),
        other => Err(TrellisError::query(format!("cannot negate {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::schema::ColumnSchema;
    use trellis_common::types::DataType;

    fn album() -> Arc<TableSchema> {
        Arc::new(
            TableSchema::builder("Album")
                .column(ColumnSchema::new("albumId", DataType::Int32))
                .column(ColumnSchema::new("title", DataType::String))
                .column(ColumnSchema::new("artistId", DataType::Int32))
                .primary_key(&["albumId"])
                .build()
                .unwrap(),
        )
    }

    fn rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::Int32(1), Value::from("For Those About To Rock"), Value::Int32(1)],
            vec![Value::Int32(2), Value::from("Balls to the Wall"), Value::Int32(2)],
            vec![Value::Int32(3), Value::from("Restless and Wild"), Value::Int32(2)],
            vec![Value::Int32(349), Value::from("Technique"), Value::Int32(277)],
        ]
    }

    fn plan(stmt: Statement) -> TrellisResult<SelectPlan> {
        SelectPlan::parse(&stmt, |name| {
            if name == "ALBUM" {
                Ok(album())
            } else {
                Err(TrellisError::TableNotFound {
                    table: name.to_string(),
                })
            }
        })
    }

    #[test]
    fn test_select_star_with_limit() {
        let plan = plan(Statement::new("SELECT * FROM Album LIMIT 2")).unwrap();
        assert_eq!(plan.table(), "ALBUM");
        assert_eq!(plan.columns(), &["ALBUMID", "TITLE", "ARTISTID"]);
        let rs = plan.execute(rows());
        assert_eq!(rs.count(), 2);
    }

    #[test]
    fn test_where_with_placeholder() {
        let stmt = Statement::new("SELECT title FROM Album WHERE artistId = ?").bind(277);
        let result: Vec<Tuple> = plan(stmt).unwrap().execute(rows()).collect();
        assert_eq!(result, vec![Tuple::new().set("title", "Technique")]);
    }

    #[test]
    fn test_numbered_placeholders_and_order() {
        let stmt = Statement::new(
            "SELECT albumId AS id FROM album WHERE artistId = $1 OR albumId = $2 ORDER BY albumId DESC",
        )
        .bind(2)
        .bind(1);
        let ids: Vec<Value> = plan(stmt)
            .unwrap()
            .execute(rows())
            .map(|t| t.get("id").cloned().unwrap())
            .collect();
        assert_eq!(ids, vec![Value::Int32(3), Value::Int32(2), Value::Int32(1)]);
    }

    #[test]
    fn test_not_and_null_predicates() {
        let stmt = Statement::new(
            "SELECT * FROM Album WHERE NOT (artistId = 2) AND title IS NOT NULL AND albumId > -1",
        );
        assert_eq!(plan(stmt).unwrap().execute(rows()).count(), 2);
    }

    #[test]
    fn test_offset() {
        let stmt = Statement::new("SELECT * FROM Album ORDER BY albumId LIMIT 2 OFFSET 1");
        let first = plan(stmt).unwrap().execute(rows()).next().unwrap();
        assert_eq!(first.get("albumId"), Some(&Value::Int32(2)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            plan(Statement::new("SELEC * FROM Album")),
            Err(TrellisError::SyntaxError { .. })
        ));
        assert!(matches!(
            plan(Statement::new("DELETE FROM Album")),
            Err(TrellisError::Unsupported { .. })
        ));
        assert!(matches!(
            plan(Statement::new("SELECT * FROM Track")),
            Err(TrellisError::TableNotFound { .. })
        ));
        assert!(matches!(
            plan(Statement::new("SELECT genre FROM Album")),
            Err(TrellisError::QueryFailed { .. })
        ));
        assert!(matches!(
            plan(Statement::new("SELECT * FROM Album WHERE albumId = ?")),
            Err(TrellisError::QueryFailed { .. })
        ));
        assert!(matches!(
            plan(Statement::new("SELECT * FROM Album").bind(1)),
            Err(TrellisError::QueryFailed { .. })
        ));
    }

    #[test]
    fn test_negating_minimum_overflows() {
        let stmt = Statement::new("SELECT * FROM Album WHERE artistId = -?").bind(i32::MIN);
        assert!(matches!(plan(stmt), Err(TrellisError::QueryFailed { .. })));

        let stmt = Statement::new("SELECT * FROM Album WHERE artistId = -?").bind(-277);
        assert_eq!(plan(stmt).unwrap().execute(rows()).count(), 1);
    }

    #[test]
    fn test_short_rows_read_as_null() {
        let stmt = Statement::new("SELECT * FROM Album ORDER BY artistId");
        let short = vec![vec![Value::Int32(7), Value::from("Short")], rows().remove(0)];
        let result: Vec<Tuple> = plan(stmt).unwrap().execute(short).collect();
        assert_eq!(result[0].get("artistId"), Some(&Value::Null));
        assert_eq!(result[1].get("albumId"), Some(&Value::Int32(1)));
    }
}
