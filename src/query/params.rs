//! Request parameters as they arrive from a query string.

use std::collections::btree_map;
use std::collections::BTreeMap;

/// Key that carries the verbatim sort expression
pub const ORDER_BY_KEY: &str = "orderby";
/// Key that carries the 1-based page number
pub const PAGE_KEY: &str = "page";
/// Key that carries the page size
pub const SIZE_KEY: &str = "size";

/// Mapping from parameter key to its values, in query-string shape.
///
/// One key may carry several values; the search layer only ever reads the
/// first. Keys iterate in sorted order, which keeps derived cache keys stable
/// across calls with the same logical parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: BTreeMap<String, Vec<String>>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the values carried by `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First value carried by `key`; a key with no values counts as absent
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.first(key).is_some()
    }

    /// Every key with its first value, in sorted key order
    pub fn iter_first(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(key, values)| values.first().map(|v| (key.as_str(), v.as_str())))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for ParameterSet {
    fn from(values: BTreeMap<String, Vec<String>>) -> Self {
        Self { values }
    }
}

impl From<std::collections::HashMap<String, Vec<String>>> for ParameterSet {
    fn from(values: std::collections::HashMap<String, Vec<String>>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ParameterSet::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
