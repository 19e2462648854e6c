//! `operator__column` key decoding.
//!
//! A key turns into a [`FilterInstruction`] only when it splits on `__` into
//! exactly two segments, the first naming a known operator and the second a
//! non-empty column. Everything else is inert: no instruction, no error.

use std::fmt;
use std::str::FromStr;

/// Delimiter between the operator and column segments of a filter key
pub const FILTER_KEY_DELIMITER: &str = "__";

/// Comparison a filter key asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `ilike`: case-insensitive substring match
    ILike,
    /// `like`: substring match
    Like,
    /// `in`: membership in a comma-separated set
    In,
    /// `eq`: equality
    Eq,
    /// `gt`
    Gt,
    /// `gte`
    Gte,
    /// `lt`
    Lt,
    /// `lte`
    Lte,
    /// `btwn`: half-open range `low <= column < high`
    Between,
}

impl FilterOperator {
    /// Token used in parameter keys
    pub fn token(self) -> &'static str {
        match self {
            FilterOperator::ILike => "ilike",
            FilterOperator::Like => "like",
            FilterOperator::In => "in",
            FilterOperator::Eq => "eq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Between => "btwn",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = ();

    /// Exact, case-sensitive match on the key token
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "ilike" => Ok(FilterOperator::ILike),
            "like" => Ok(FilterOperator::Like),
            "in" => Ok(FilterOperator::In),
            "eq" => Ok(FilterOperator::Eq),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "btwn" => Ok(FilterOperator::Between),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One column/operator/value triple derived from a parameter key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInstruction {
    pub operator: FilterOperator,
    pub column: String,
    pub value: String,
}

impl FilterInstruction {
    /// Decode `key` and its first value, or `None` when the key is not a filter.
    ///
    /// ```
    /// use lifeguard_search::query::{FilterInstruction, FilterOperator};
    ///
    /// let f = FilterInstruction::parse("gte__id", "2").unwrap();
    /// assert_eq!(f.operator, FilterOperator::Gte);
    /// assert_eq!(f.column, "id");
    ///
    /// assert!(FilterInstruction::parse("page", "1").is_none());
    /// assert!(FilterInstruction::parse("nggn__createdat", "x").is_none());
    /// ```
    pub fn parse(key: &str, value: &str) -> Option<Self> {
        let mut segments = key.split(FILTER_KEY_DELIMITER);
        let (operator, column) = match (segments.next(), segments.next(), segments.next()) {
            (Some(operator), Some(column), None) => (operator, column),
            _ => return None,
        };
        if column.is_empty() {
            return None;
        }
        let operator = operator.parse::<FilterOperator>().ok()?;
        Some(Self {
            operator,
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}
