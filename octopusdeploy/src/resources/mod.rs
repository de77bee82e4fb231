//! Resource implementations

pub mod certificate;
pub mod common;
pub mod library_variable_set;

pub use certificate::CertificateResource;
pub use library_variable_set::LibraryVariableSetResource;
