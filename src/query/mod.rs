//! Query-string search translation.
//!
//! - **Params**: the raw `key -> values` input ([`ParameterSet`])
//! - **Filter**: `operator__column` key decoding ([`FilterInstruction`])
//! - **Pagination**: `page`/`size` resolution ([`PageSpec`])
//! - **Select**: the query handle ([`SelectQuery`])
//! - **Translate**: applying parameters to the handle ([`Translator`])
//! - **Execution**: `all`, `first` and `count` on the handle
//!
//! ```
//! use lifeguard_search::query::{apply_parameters, ParameterSet, SelectQuery};
//!
//! let params: ParameterSet = [("gte__id", "2"), ("orderby", "id DESC")].into_iter().collect();
//! let query = apply_parameters(SelectQuery::new("users"), &params).unwrap();
//! assert_eq!(
//!     query.to_sql(),
//!     r#"SELECT * FROM "users" WHERE "id" >= '2' ORDER BY id DESC LIMIT 10 OFFSET 0"#
//! );
//! ```

pub mod entity;
pub mod filter;
pub mod pagination;
pub mod params;
pub mod select;
pub mod translate;

mod execution;

#[doc(inline)]
pub use entity::{SearchEntity, Table};
#[doc(inline)]
pub use filter::{FilterInstruction, FilterOperator};
#[doc(inline)]
pub use pagination::PageSpec;
#[doc(inline)]
pub use params::ParameterSet;
#[doc(inline)]
pub use select::SelectQuery;
#[doc(inline)]
pub use translate::{apply_parameters, predicate, SearchPolicy, Translator};
