// Persistence Store: durable workflow definitions and paused execution envelopes.

pub mod db;
pub mod error;
pub mod models;

pub use db::Database;
pub use error::{Result, StoreError};
