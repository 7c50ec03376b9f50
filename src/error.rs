use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::repository::StoreError;

pub(crate) type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("The given data was invalid.")]
    Validation(FieldErrors),

    #[error("No query results for {resource} {id}.")]
    NotFound { resource: &'static str, id: i32 },

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("This action is unauthorized.")]
    Forbidden,

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error("background task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub(crate) fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub(crate) fn food_not_found(id: i32) -> Self {
        ApiError::NotFound { resource: "food", id }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, kind) in errors.errors() {
            if let ValidationErrorsKind::Field(errors) = kind {
                let messages = errors
                    .iter()
                    .map(|error| describe(field, error))
                    .collect();
                fields.insert(field.to_string(), messages);
            }
        }
        ApiError::Validation(fields)
    }
}

fn describe(field: &str, error: &validator::ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let label = field.replace('_', " ");
    let param = |name: &str| error.params.get(name).map(|value| value.to_string());
    match &*error.code {
        "range" => match param("min") {
            Some(min) => format!("The {} must be at least {}.", label, min),
            None => format!("The {} is out of range.", label),
        },
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!(
                "The {} must be between {} and {} characters.",
                label, min, max
            ),
            (None, Some(max)) => {
                format!("The {} must not be greater than {} characters.", label, max)
            }
            _ => format!("The {} has an invalid length.", label),
        },
        code => format!("The {} is invalid ({}).", label, code),
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Persistence(StoreError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Persistence(_) | ApiError::Blocking(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(errors) => {
                log::debug!("rejected invalid input: {:?}", errors);
                json!({ "message": self.to_string(), "errors": errors })
            }
            ApiError::Persistence(_) | ApiError::Blocking(_) | ApiError::Internal(_) => {
                log::error!("request failed: {}", self);
                json!({ "message": "Server Error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}
