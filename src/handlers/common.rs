use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{Rule, ServiceError};

/// JSON body extractor whose rejections use the service error body.
///
/// Axum answers 415/422 for bodies it cannot read; every such failure is a
/// 400 `malformed_body` violation here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(malformed_body(rejection)),
        }
    }
}

fn malformed_body(rejection: JsonRejection) -> ServiceError {
    ServiceError::violation("body", Rule::MalformedBody, rejection.body_text())
}

/// Decodes a body read as loose JSON into its request type.
pub fn decode_body<T: DeserializeOwned>(body: Value) -> Result<T, ServiceError> {
    serde_json::from_value(body).map_err(|e| {
        ServiceError::violation(
            "body",
            Rule::MalformedBody,
            format!("Failed to deserialize the JSON body into the target type: {}", e),
        )
    })
}

/// Integer order reference of a create body, under `order` or `order_id`.
pub fn order_reference(body: &Value) -> Option<i64> {
    body.get("order")
        .or_else(|| body.get("order_id"))
        .and_then(Value::as_i64)
}

/// Order ids in paths are positive integers; anything else names no order.
pub fn parse_order_id(raw: &str) -> Result<i64, ServiceError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ServiceError::NotFound(format!("Order {} does not exist", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Body {
        #[allow(dead_code)]
        status: String,
    }

    async fn extract(content_type: Option<&str>, body: &'static str) -> Result<ApiJson<Body>, ServiceError> {
        let mut builder = Request::builder().method("PATCH").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let req = builder.body(axum::body::Body::from(body)).unwrap();
        ApiJson::<Body>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn accepts_well_formed_body() {
        let ApiJson(body) = extract(Some("application/json"), r#"{"status":"CONFIRMED"}"#)
            .await
            .unwrap();
        assert_eq!(body.status, "CONFIRMED");
    }

    #[tokio::test]
    async fn every_rejection_is_a_bad_request() {
        for (content_type, body) in [
            (Some("application/json"), "{not json"),
            (Some("application/json"), r#"{"status":"CONFIRMED","extra":1}"#),
            (Some("application/json"), r#"{}"#),
            (Some("text/plain"), r#"{"status":"CONFIRMED"}"#),
            (None, r#"{"status":"CONFIRMED"}"#),
        ] {
            let err = extract(content_type, body).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert_eq!(err.rule(), Some(Rule::MalformedBody));
        }
    }

    #[test]
    fn decoding_reports_shape_errors_as_malformed_body() {
        let body: Body = decode_body(serde_json::json!({"status": "CONFIRMED"})).unwrap();
        assert_eq!(body.status, "CONFIRMED");

        for value in [
            serde_json::json!({}),
            serde_json::json!({"status": 5}),
            serde_json::json!([]),
        ] {
            let err = decode_body::<Body>(value).unwrap_err();
            assert_eq!(err.rule(), Some(Rule::MalformedBody));
        }
    }

    #[test]
    fn order_reference_reads_either_key() {
        assert_eq!(order_reference(&serde_json::json!({"order": 7})), Some(7));
        assert_eq!(order_reference(&serde_json::json!({"order_id": 8})), Some(8));
        assert_eq!(order_reference(&serde_json::json!({"order": "7"})), None);
        assert_eq!(order_reference(&serde_json::json!([1])), None);
    }

    #[test]
    fn non_numeric_ids_are_not_found() {
        assert_eq!(parse_order_id("42").unwrap(), 42);
        for raw in ["abc", "0", "-1", "1.5", ""] {
            assert_eq!(
                parse_order_id(raw).unwrap_err().status_code(),
                StatusCode::NOT_FOUND
            );
        }
    }
}
