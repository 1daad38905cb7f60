pub mod error;
pub mod filter;
pub mod filter_order;
pub mod handlers;
pub mod paginated;
pub mod params;
pub mod query_filter;
pub mod types;

pub use error::QueryError;
pub use filter::Filter;
pub use handlers::{EqualsFilterHandler, FilterHandler, FilterHandlerRegistry, SearchFilterHandler};
pub use paginated::PaginatedList;
pub use params::{FilteringParameters, OrderingParameters, PaginatedQuery, PaginationParameters};
pub use query_filter::QueryFilter;
pub use types::*;
