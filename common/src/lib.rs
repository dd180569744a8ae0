pub mod cache;
pub mod config;
pub mod error;
pub mod schema;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use schema::*;
