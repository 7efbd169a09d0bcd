//! Conversions from external infrastructure errors into domain errors.

use focusmode_domain::FocusError;
use reqwest::Error as HttpError;
use reqwest::StatusCode;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FocusError);

impl From<InfraError> for FocusError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FocusError> for InfraError {
    fn from(value: FocusError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoFocusError {
    fn into_focus(self) -> FocusError;
}

/* -------------------------------------------------------------------------- */
/* HTTP status → FocusError */
/* -------------------------------------------------------------------------- */

/// Map a non-success HTTP status (plus the server's message, if any) to a
/// domain error.
pub fn status_error(status: StatusCode, detail: &str) -> FocusError {
    let code = status.as_u16();
    let mut message =
        format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
    if !detail.is_empty() {
        message.push_str(": ");
        message.push_str(detail);
    }

    match code {
        401 | 403 => FocusError::Auth(message),
        404 => FocusError::NotFound(message),
        408 | 429 => FocusError::Network(message),
        400..=499 => FocusError::Backend(message),
        _ => FocusError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FocusError */
/* -------------------------------------------------------------------------- */

impl IntoFocusError for HttpError {
    fn into_focus(self) -> FocusError {
        if self.is_timeout() {
            return FocusError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return FocusError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status, "");
        }

        if self.is_decode() {
            return FocusError::Serialization(format!("invalid response body: {self}"));
        }

        if self.is_builder() {
            return FocusError::InvalidInput(format!("invalid request: {self}"));
        }

        FocusError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_focus())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → FocusError */
/* -------------------------------------------------------------------------- */

impl IntoFocusError for JsonError {
    fn into_focus(self) -> FocusError {
        FocusError::Serialization(format!("JSON error at line {}: {}", self.line(), self))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_focus())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → FocusError */
/* -------------------------------------------------------------------------- */

impl IntoFocusError for std::io::Error {
    fn into_focus(self) -> FocusError {
        match self.kind() {
            std::io::ErrorKind::NotFound => FocusError::NotFound(self.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                FocusError::Config(format!("permission denied: {self}"))
            }
            _ => FocusError::Internal(format!("I/O error: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_focus())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → FocusError */
/* -------------------------------------------------------------------------- */

impl IntoFocusError for url::ParseError {
    fn into_focus(self) -> FocusError {
        FocusError::InvalidInput(format!("invalid URL: {self}"))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(value.into_focus())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
