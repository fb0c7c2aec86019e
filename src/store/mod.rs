//! Ad persistence.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlAdStore;
pub use traits::{AdRecord, AdRepository, NewAd};
