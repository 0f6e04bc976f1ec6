use crate::object_store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub const IMAGE_DATA_INVALID: &str = "ImageData missing or invalid";
pub const TEMPLATE_LIST_MISSING: &str =
    "Request is not properly formated. TemplateList parameter is missing";
pub const SINGLE_TEMPLATE_INVALID: &str = "SingleTemplate missing or invalid";
pub const TEMPLATE_LIST_INVALID: &str = "TemplateList missing or invalid";

/// Errors surfaced to API callers
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required request field is missing or malformed
    #[error("{0}")]
    InvalidInput(&'static str),

    /// The object store or face comparator failed
    #[error("{0}")]
    ExternalService(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::ExternalService(e.to_string())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_string())).into_response()
    }
}
