pub mod manager;
pub mod models;
pub mod query_builder;
pub mod query_service;

pub use manager::{DatabaseError, DatabaseManager};
pub use query_service::{Entity, QueryOptions, QueryService};
