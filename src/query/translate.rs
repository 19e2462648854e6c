//! Parameter-to-predicate translation.
//!
//! Every `operator__column` key becomes one predicate on the handle, all of
//! them conjoined. `orderby` passes through as the sort expression and
//! pagination is applied last. The only translation-time failure is a `btwn`
//! value that does not split into exactly two parts (plus column rejections
//! when the strict policy is on). Anything else odd is ignored here and left
//! for the database to judge.

use crate::error::SearchError;
use crate::query::entity::SearchEntity;
use crate::query::filter::{FilterInstruction, FilterOperator};
use crate::query::pagination::PageSpec;
use crate::query::params::{ParameterSet, ORDER_BY_KEY, PAGE_KEY, SIZE_KEY};
use crate::query::select::{Name, SelectQuery};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::extension::postgres::PgExpr;
use sea_query::{Expr, ExprTrait};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// `<column>` optionally followed by `ASC` or `DESC`
static ORDER_EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s+(?i:asc|desc))?\s*$")
        .expect("order expression pattern is valid")
});

/// Hardening switches; the default is fully permissive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Reject filter and `orderby` columns the entity does not publish.
    /// Has no effect for entities without a column list.
    pub strict_columns: bool,
    /// Clamp requested page sizes to this value
    pub max_page_size: Option<u64>,
}

/// Applies a [`ParameterSet`] to a [`SelectQuery`] for one entity
pub struct Translator<'a> {
    policy: SearchPolicy,
    columns: Option<&'a [&'a str]>,
}

impl<'a> Translator<'a> {
    /// Permissive translator with no column knowledge
    pub fn new(policy: SearchPolicy) -> Self {
        Self {
            policy,
            columns: None,
        }
    }

    /// Translator that knows the entity's published columns
    pub fn for_entity<E: SearchEntity + ?Sized>(policy: SearchPolicy, entity: &'a E) -> Self {
        Self {
            policy,
            columns: entity.column_names(),
        }
    }

    /// Filters, then ordering, then pagination.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidRange` for a malformed `btwn` value and
    /// `SearchError::UnknownColumn` when the strict policy rejects a column.
    pub fn apply(&self, query: SelectQuery, params: &ParameterSet) -> Result<SelectQuery, SearchError> {
        let query = self.apply_filters(query, params)?;
        let query = self.apply_ordering(query, params)?;
        Ok(self.apply_pagination(query, params))
    }

    /// Add one predicate per applicable filter key.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn apply_filters(
        &self,
        mut query: SelectQuery,
        params: &ParameterSet,
    ) -> Result<SelectQuery, SearchError> {
        for (key, value) in params.iter_first() {
            if is_reserved(key) {
                continue;
            }
            let Some(instruction) = FilterInstruction::parse(key, value) else {
                log::debug!("ignoring parameter {key:?}: not an operator__column filter");
                #[cfg(feature = "metrics")]
                METRICS.record_skipped_parameter();
                continue;
            };
            self.check_column(&instruction.column)?;
            query = query.filter(predicate(&instruction)?);
        }
        Ok(query)
    }

    /// Pass `orderby` through as the sort expression.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::UnknownColumn` when the strict policy is on and the
    /// expression is not a known column with an optional direction.
    pub fn apply_ordering(
        &self,
        query: SelectQuery,
        params: &ParameterSet,
    ) -> Result<SelectQuery, SearchError> {
        let Some(expression) = params.first(ORDER_BY_KEY) else {
            return Ok(query);
        };
        if expression.trim().is_empty() {
            log::debug!("ignoring empty orderby");
            #[cfg(feature = "metrics")]
            METRICS.record_skipped_parameter();
            return Ok(query);
        }

        if self.enforces_columns() {
            let column = ORDER_EXPRESSION
                .captures(expression)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .ok_or_else(|| SearchError::UnknownColumn {
                    column: expression.to_string(),
                })?;
            self.check_column(column)?;
        } else {
            log::warn!("orderby {expression:?} passed through unvalidated");
        }

        Ok(query.order_by_raw(expression))
    }

    /// Apply offset and limit from `page`/`size`; never fails.
    pub fn apply_pagination(&self, query: SelectQuery, params: &ParameterSet) -> SelectQuery {
        let pages = self.page_spec(params);
        query.offset(pages.offset()).limit(pages.limit())
    }

    /// Resolved page request, clamped by the policy
    pub fn page_spec(&self, params: &ParameterSet) -> PageSpec {
        let pages = PageSpec::resolve(params.first(PAGE_KEY), params.first(SIZE_KEY));
        match self.policy.max_page_size {
            Some(max) if pages.size > max => {
                log::warn!("page size {} clamped to {max}", pages.size);
                #[cfg(feature = "metrics")]
                METRICS.record_page_size_clamp();
                pages.clamped(max)
            }
            _ => pages,
        }
    }

    fn enforces_columns(&self) -> bool {
        self.policy.strict_columns && self.columns.is_some()
    }

    fn check_column(&self, column: &str) -> Result<(), SearchError> {
        match self.columns {
            Some(known) if self.policy.strict_columns && !known.iter().any(|k| *k == column) => {
                Err(SearchError::UnknownColumn {
                    column: column.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(key, ORDER_BY_KEY | PAGE_KEY | SIZE_KEY)
}

/// Predicate for one filter instruction.
///
/// Values stay strings; the database coerces them to the column type.
///
/// # Errors
///
/// Returns `SearchError::InvalidRange` when a `btwn` value does not split into
/// exactly two comma-separated parts.
pub fn predicate(instruction: &FilterInstruction) -> Result<Expr, SearchError> {
    let column = || Expr::col(Name(instruction.column.clone()));
    let value = instruction.value.as_str();

    let expr = match instruction.operator {
        FilterOperator::ILike => column().ilike(format!("%{value}%")),
        FilterOperator::Like => column().like(format!("%{value}%")),
        FilterOperator::In => column().is_in(value.split(',').map(str::to_string)),
        FilterOperator::Eq => column().eq(value),
        FilterOperator::Gt => column().gt(value),
        FilterOperator::Gte => column().gte(value),
        FilterOperator::Lt => column().lt(value),
        FilterOperator::Lte => column().lte(value),
        FilterOperator::Between => {
            let bounds: Vec<&str> = value.split(',').collect();
            let [low, high] = bounds.as_slice() else {
                return Err(SearchError::InvalidRange {
                    column: instruction.column.clone(),
                    value: instruction.value.clone(),
                });
            };
            column().gte(*low).and(column().lt(*high))
        }
    };
    Ok(expr)
}

/// Filters, ordering and pagination with the permissive default policy.
///
/// # Errors
///
/// Returns `SearchError::InvalidRange` for a malformed `btwn` value.
pub fn apply_parameters(query: SelectQuery, params: &ParameterSet) -> Result<SelectQuery, SearchError> {
    Translator::new(SearchPolicy::default()).apply(query, params)
}
