pub mod identity;
pub mod response;

pub use identity::{identity_middleware, resolve_identity};
pub use response::{ApiResponse, ApiResult};
