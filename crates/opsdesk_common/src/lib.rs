// --- File: crates/opsdesk_common/src/lib.rs ---

pub mod auth; // Operator authentication middleware
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Shared domain records
pub mod services; // Service abstractions

#[cfg(test)]
mod auth_test;
#[cfg(test)]
mod http_test;

pub use error::{
    config_error, conflict, external_service_error, internal_error, not_found, validation_error,
    Context, HttpStatusCode, OpsdeskError,
};

pub use http::{
    client::{post_form, HTTP_CLIENT},
    error_response, handle_json_result, handle_result, map_json_error, IntoHttpResponse,
};

pub use logging::{init, init_from_config, init_with_level, log_error, log_result};

pub use auth::{operator_auth_middleware, OperatorAuthState, OperatorId, OPERATOR_ID_HEADER};

// Shared models, errors, logging and collaborator traits used by every Opsdesk crate.
