//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for resources whose import ID is the remote identifier;
/// the read that follows import fills in everything else.
///
/// Example: ID "Certificates-1" -> state.id = "Certificates-1"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse {
        imported_resources: Vec::new(),
        diagnostics: Vec::new(),
    };

    if request.id.trim().is_empty() {
        response.diagnostics.push(
            Diagnostic::error(
                "Invalid import ID",
                format!("An empty ID cannot be imported into {}", request.type_name),
            )
            .with_attribute(attr_path),
        );
        return response;
    }

    let mut state = DynamicValue::empty_object();
    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return response;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
    response
}
