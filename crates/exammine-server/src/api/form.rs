//! Form input accepted as urlencoded, multipart or JSON bodies.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::middleware::RequestId;

use super::ApiError;

/// Deserializes `T` from whichever body encoding the client sent.
///
/// Multipart file parts are ignored; every other part becomes a string field.
#[derive(Debug)]
pub(in crate::api) struct FlexibleForm<T>(pub T);

impl<S, T> FromRequest<S> for FlexibleForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let req_id = req
            .extensions()
            .get::<RequestId>()
            .map_or_else(String::new, |rid| rid.0.clone());
        let invalid = |message: String| ApiError::new(req_id.clone(), "validation_error", message);

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| invalid(e.body_text()))?;
            return Ok(Self(value));
        }

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| invalid(e.body_text()))?;
            let mut fields = Map::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| invalid(e.body_text()))?
            {
                if field.file_name().is_some() {
                    continue;
                }
                let Some(name) = field.name().map(ToOwned::to_owned) else {
                    continue;
                };
                let text = field.text().await.map_err(|e| invalid(e.body_text()))?;
                fields.insert(name, Value::String(text));
            }
            let value = serde_json::from_value(Value::Object(fields))
                .map_err(|e| invalid(format!("invalid form data: {e}")))?;
            return Ok(Self(value));
        }

        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| invalid(e.body_text()))?;
        Ok(Self(value))
    }
}
