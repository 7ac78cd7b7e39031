// Structured Data Store: dynamic-table SQL upsert/query backing the
// `database_save` and `database_query` actions.

pub mod error;
pub mod store;

pub use error::{DataError, Result};
pub use store::DataStore;
