//! tfplug - Terraform Plugin Framework for Rust
//!
//! The provider-facing half of a Terraform plugin: schemas, typed decoding of
//! configuration and state, diagnostics, and the provider, resource and data
//! source traits. Wire transport is left to the host.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod sensitive;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod testing;
pub mod validator;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{DataSourceFactory, Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use sensitive::Sensitive;
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
