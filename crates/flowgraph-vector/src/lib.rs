// Vector Store Adapter backing `vector_db_ingestion` / `vector_db_query`.

pub mod error;
pub mod store;

pub use error::{Result, VectorError};
pub use store::VectorStore;
