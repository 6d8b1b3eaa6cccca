//! Request extractors whose rejections render as JSON `ApiError`s.

use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header::CONTENT_TYPE, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A create/update body, either JSON or `application/x-www-form-urlencoded`.
///
/// Form keys written as `team[home]` become nested objects, so the admin
/// form and JSON clients produce the same shape. Schema checking happens in
/// the handler.
pub struct Payload(pub Value);

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Payload(form_to_json(fields)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Payload(value))
        }
    }
}

/// Numeric `{id}` path segment.
pub struct Id(pub i64);

impl<S> FromRequestParts<S> for Id
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Id(id))
    }
}

/// Query string parameters.
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Params(params))
    }
}

fn form_to_json(fields: HashMap<String, String>) -> Value {
    let mut out = Map::new();
    for (key, value) in fields {
        match key.split_once('[') {
            Some((outer, rest)) if rest.ends_with(']') => {
                let inner = rest.trim_end_matches(']').to_string();
                let entry = out
                    .entry(outer.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(nested) = entry {
                    nested.insert(inner, Value::String(value));
                }
            }
            _ => {
                out.insert(key, Value::String(value));
            }
        }
    }
    Value::Object(out)
}
