pub mod query;
pub mod token;
pub mod translations;
