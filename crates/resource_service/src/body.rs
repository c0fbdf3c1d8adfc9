use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use domain::Document;
use serde_json::Value;

use crate::error::ApiError;

/// Request body parsed the way `express.json()` would see it.
///
/// Bodies without a JSON content type, and empty bodies, read as `{}`.
/// Malformed JSON is rejected with a validation error.
#[derive(Debug)]
pub struct JsonBody(pub Value);

fn is_json_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || mime.to_ascii_lowercase().ends_with("+json")
}

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

        if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Object(Document::new())));
        }

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))
    }
}

impl JsonBody {
    /// Body used as a new document on insert routes.
    ///
    /// Arrays are spread into index keys, so `["a","b"]` becomes
    /// `{"0":"a","1":"b"}`.
    pub fn into_document(self) -> Result<Document, ApiError> {
        match self.0 {
            Value::Array(items) => Ok(items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect()),
            value => JsonBody(value).into_object(),
        }
    }

    /// Body used as the field set of a `$set` update
    pub fn into_object(self) -> Result<Document, ApiError> {
        match self.0 {
            Value::Object(fields) => Ok(fields),
            _ => Err(ApiError::Validation(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    /// Body appended as one array element. Arrays are pushed whole.
    pub fn into_element(self) -> Result<Value, ApiError> {
        match self.0 {
            value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
            _ => Err(ApiError::Validation(
                "Request body must be a JSON object or array".to_string(),
            )),
        }
    }
}
