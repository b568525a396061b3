pub mod error;
pub mod models;
pub mod services;
pub mod test_utils;

pub use error::*;
pub use models::*;
pub use services::*;
