mod client;
mod error;
mod ml_commons;
pub mod requests;

// Re-export public types
pub use client::{MlApi, TaskEndpoint};
pub use error::ApiError;
pub use ml_commons::MlCommonsClient;
