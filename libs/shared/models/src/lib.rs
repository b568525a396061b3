pub mod error;
pub mod identity;

pub use error::AppError;
pub use identity::{Identity, IdentityRole};
