use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use datastore::StoreError;

/// Failure outcomes of a resource route.
///
/// Every variant renders as a plain-text body; only the status code differs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The lookup matched nothing (404)
    #[error("{0}")]
    NotFound(&'static str),

    /// The request body could not be used (400)
    #[error("{0}")]
    Validation(String),

    /// The document store rejected the operation (500)
    #[error("Error {action} {subject}: {source}")]
    Store {
        action: &'static str,
        subject: &'static str,
        source: StoreError,
    },
}

impl ApiError {
    pub fn store(action: &'static str, subject: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store {
            action,
            subject,
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Store { source, .. } => tracing::error!(error = %source, "{}", self),
            Self::Validation(reason) => tracing::debug!(%reason, "rejected request body"),
            Self::NotFound(_) => {}
        }
        (status, self.to_string()).into_response()
    }
}
