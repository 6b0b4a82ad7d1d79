use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::{ValidationErrors, ValidationErrorsKind};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Business rule or input check that rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    ItemsRequired,
    TotalMismatch,
    DuplicateExternalId,
    InvalidStatusValue,
    InvalidTransition,
    AmountMismatch,
    DuplicateInvoice,
    OrderCancelled,
    DuplicateFulfillment,
    InvalidOrderStatus,
    InvalidField,
    MalformedBody,
}

/// A single rejected field together with the rule it broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "field": "total_amount",
    "rule": "total_mismatch",
    "message": "Total amount does not match item totals."
}))]
pub struct Violation {
    #[schema(example = "total_amount")]
    pub field: String,
    pub rule: Rule,
    #[schema(example = "Total amount does not match item totals.")]
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Validation error: status: Invalid status transition",
    "errors": [{"field": "status", "rule": "invalid_transition", "message": "Invalid status transition"}],
    "request_id": "2f1d7c9e-52d4-4d8e-9a57-0c3c1f1f5b11",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Field-level failures, present for validation errors only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Violation>,
    /// Request identifier echoed from `x-request-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {}", summarize(.0))]
    ValidationError(Vec<Violation>),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    /// Single-rule validation failure.
    pub fn violation(field: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self::ValidationError(vec![Violation::new(field, rule, message)])
    }

    pub fn order_not_found(order_id: i64) -> Self {
        Self::NotFound(format!("Order {} does not exist", order_id))
    }

    /// Rule of the first violation, if this is a validation failure.
    pub fn rule(&self) -> Option<Rule> {
        match self {
            Self::ValidationError(violations) => violations.first().map(|v| v.rule),
            _ => None,
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::MigrationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::MigrationError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        let mut violations = Vec::new();
        flatten_validation_errors(&err, None, &mut violations);
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::ValidationError(violations)
    }
}

/// Walks nested validator output into `field`, `items[0].quantity` style paths.
fn flatten_validation_errors(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    out: &mut Vec<Violation>,
) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    out.push(Violation::new(path.clone(), Rule::InvalidField, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                flatten_validation_errors(nested, Some(&path), out);
            }
            ValidationErrorsKind::List(entries) => {
                for (index, nested) in entries {
                    let indexed = format!("{}[{}]", path, index);
                    flatten_validation_errors(nested, Some(&indexed), out);
                }
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.response_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let errors = match self {
            ServiceError::ValidationError(violations) => violations,
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            errors,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::order_not_found(999).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(payload.errors.is_empty());
    }

    #[tokio::test]
    async fn validation_error_body_lists_violations() {
        let response = ServiceError::violation(
            "status",
            Rule::InvalidTransition,
            "Invalid status transition",
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Bad Request");
        assert_eq!(payload.errors.len(), 1);
        assert_eq!(payload.errors[0].field, "status");
        assert_eq!(payload.errors[0].rule, Rule::InvalidTransition);
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::violation("items", Rule::ItemsRequired, "x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("password=hunter2".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::MigrationError("table exists".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::order_not_found(7).response_message(),
            "Not found: Order 7 does not exist"
        );
    }

    #[derive(Validate)]
    struct Line {
        #[validate(range(min = 1))]
        quantity: i32,
    }

    #[derive(Validate)]
    struct Basket {
        #[validate(length(min = 1, max = 3))]
        code: String,
        #[validate]
        lines: Vec<Line>,
    }

    #[test]
    fn nested_validation_errors_are_flattened_to_paths() {
        let basket = Basket {
            code: "TOOLONG".into(),
            lines: vec![Line { quantity: 1 }, Line { quantity: 0 }],
        };
        let err: ServiceError = basket.validate().unwrap_err().into();

        let ServiceError::ValidationError(violations) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["code", "lines[1].quantity"]);
        assert!(violations.iter().all(|v| v.rule == Rule::InvalidField));
    }
}
