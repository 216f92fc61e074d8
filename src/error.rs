use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::SqlErr;
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[source] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[source] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Unique constraints from `migrations/` and the message reported when one trips.
const UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[
    ("users_email_key", "Email is already taken"),
    ("users_username_key", "Username is already taken"),
    ("unique_name_author", "You already have a recipe with this name"),
    ("unique_ingredient_unit", "Ingredient with this unit already exists"),
    ("unique_following", "Already subscribed to this author"),
    ("unique_favorite_recipe", "Recipe is already in favorites"),
    ("unique_cart_recipe", "Recipe is already in the shopping cart"),
];

impl AppError {
    /// The 400 returned when an insert or update violates a unique constraint.
    /// `detail` is the constraint name or the database message naming it.
    pub fn conflict(detail: &str) -> Self {
        let message = UNIQUE_CONSTRAINTS
            .iter()
            .find(|(constraint, _)| detail.contains(constraint))
            .map(|(_, message)| *message)
            .unwrap_or("Resource already exists");
        AppError::BadRequest(message.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::conflict(db_err.constraint().unwrap_or_default());
            }
        }
        AppError::DbError(err)
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return AppError::conflict(&detail);
        }
        AppError::OrmError(err)
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
