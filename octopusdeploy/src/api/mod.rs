pub mod certificates;
pub mod client;
pub mod common;
pub mod error;
pub mod library_variable_sets;
pub mod machines;
pub mod sensitive;

pub use client::{Client, RetryConfig};
pub use common::ResourceCollection;
pub use error::ApiError;
pub use sensitive::SensitiveValue;
