//! Select query handle.
//!
//! `SelectQuery` is the mutable handle the translator writes into. Predicates
//! live in a sea-query `SelectStatement`; the sort expression is kept as the
//! caller's raw text and pagination as plain numbers, so the count query can
//! drop both without string surgery.

use sea_query::{Asterisk, Iden, IntoCondition, PostgresQueryBuilder, QueryStatementWriter, SelectStatement};

/// Owned identifier for a table or column named at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Name(pub(crate) String);

impl Iden for Name {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// Query builder for selecting records from one table
///
/// Builder methods consume the handle and return it, so every step replaces
/// the caller's binding.
///
/// ```
/// use lifeguard_search::query::SelectQuery;
/// use sea_query::{Expr, ExprTrait};
///
/// let query = SelectQuery::new("users")
///     .filter(Expr::col("id").gte("2"))
///     .order_by_raw("id DESC")
///     .limit(10)
///     .offset(0);
///
/// assert_eq!(
///     query.to_sql(),
///     r#"SELECT * FROM "users" WHERE "id" >= '2' ORDER BY id DESC LIMIT 10 OFFSET 0"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    pub(crate) statement: SelectStatement,
    order: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    /// `SELECT * FROM <table>` with no predicates
    pub fn new(table_name: impl Into<String>) -> Self {
        let table = table_name.into();
        let mut statement = SelectStatement::default();
        statement.column(Asterisk).from(Name(table.clone()));
        Self {
            table,
            statement,
            order: None,
            limit: None,
            offset: None,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Add a predicate; all predicates are conjoined
    pub fn filter<F>(mut self, condition: F) -> Self
    where
        F: IntoCondition,
    {
        self.statement.cond_where(condition.into_condition());
        self
    }

    /// Set the sort expression, passed through to SQL verbatim.
    ///
    /// The text is not escaped. Callers that accept it from untrusted input
    /// should check it first (see `SearchPolicy::strict_columns`).
    pub fn order_by_raw(mut self, expression: impl Into<String>) -> Self {
        self.order = Some(expression.into());
        self
    }

    /// Append `"<table>"."<column>"` as the last sort key.
    ///
    /// Used as a tie-breaker so single-row fetches are stable across calls.
    pub fn then_order_by_column(mut self, column: &str) -> Self {
        let key = format!("{}.{}", quote_ident(&self.table), quote_ident(column));
        self.order = Some(match self.order.take() {
            Some(expression) => format!("{expression}, {key}"),
            None => key,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_expression(&self) -> Option<&str> {
        self.order.as_deref()
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Predicates only: `SELECT * FROM <table> [WHERE ...]`
    pub fn filtered_sql(&self) -> String {
        self.statement.to_string(PostgresQueryBuilder)
    }

    /// Full statement with order and pagination
    pub fn to_sql(&self) -> String {
        let mut sql = self.filtered_sql();
        if let Some(order) = &self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }

    /// `COUNT(*)` over the same predicates; order and pagination are excluded
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM ({}) AS count_subquery",
            self.filtered_sql()
        )
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
