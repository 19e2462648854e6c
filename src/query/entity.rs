//! Model descriptors.

/// Describes the table a lookup reads from
///
/// Only `table_name` is required. Publishing `column_names` lets the strict
/// column policy reject filters and sort expressions on anything else;
/// publishing `primary_key` makes single-row lookups order by it last.
pub trait SearchEntity {
    /// Target table identifier
    fn table_name(&self) -> &str;

    /// Known columns, when the model publishes them
    fn column_names(&self) -> Option<&[&str]> {
        None
    }

    /// Primary key column, used as the final sort key of `find_one`
    fn primary_key(&self) -> Option<&str> {
        None
    }
}

impl<E: SearchEntity + ?Sized> SearchEntity for &E {
    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn column_names(&self) -> Option<&[&str]> {
        (**self).column_names()
    }

    fn primary_key(&self) -> Option<&str> {
        (**self).primary_key()
    }
}

/// Descriptor for a table named at runtime
///
/// ```
/// use lifeguard_search::query::{SearchEntity, Table};
///
/// let users = Table::new("users")
///     .with_columns(&["id", "username", "createdat"])
///     .with_primary_key("id");
/// assert_eq!(users.table_name(), "users");
/// assert_eq!(users.column_names().map(<[_]>::len), Some(3));
/// assert_eq!(users.primary_key(), Some("id"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    name: &'static str,
    columns: Option<&'static [&'static str]>,
    primary_key: Option<&'static str>,
}

impl Table {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: None,
            primary_key: None,
        }
    }

    pub const fn with_columns(mut self, columns: &'static [&'static str]) -> Self {
        self.columns = Some(columns);
        self
    }

    pub const fn with_primary_key(mut self, column: &'static str) -> Self {
        self.primary_key = Some(column);
        self
    }
}

impl SearchEntity for Table {
    fn table_name(&self) -> &str {
        self.name
    }

    fn column_names(&self) -> Option<&[&str]> {
        self.columns
    }

    fn primary_key(&self) -> Option<&str> {
        self.primary_key
    }
}
