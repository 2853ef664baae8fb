use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use api_types::ApiResponse;

pub use server::{run, run_with_listener, spawn_with_listener};

mod accounts;
mod budgets;
mod server;
mod transactions;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) | EngineError::InsufficientFunds(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn code_for_engine_error(err: &EngineError) -> &'static str {
    match err {
        EngineError::Validation(_) | EngineError::InsufficientFunds(_) => "VALIDATION_ERROR",
        EngineError::NotFound(_) => "NOT_FOUND",
        EngineError::Conflict(_) => "CONFLICT",
        EngineError::Unauthorized(_) => "UNAUTHORIZED",
        EngineError::Database(_) => "INTERNAL_SERVER_ERROR",
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            ServerError::Engine(err) => {
                let status = status_for_engine_error(&err);
                let code = code_for_engine_error(&err);
                (status, code, message_for_engine_error(err))
            }
            ServerError::Generic(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
        };

        let body = ApiResponse::<()> {
            message,
            status: status.as_u16(),
            data: None,
            code: Some(code.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Success envelope with a payload.
pub(crate) fn success<T>(
    status: StatusCode,
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            message: message.into(),
            status: status.as_u16(),
            data: Some(data),
            code: None,
        }),
    )
}

/// Success envelope without a payload, for deletes.
pub(crate) fn success_empty(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    (
        status,
        Json(ApiResponse {
            message: message.into(),
            status: status.as_u16(),
            data: None,
            code: None,
        }),
    )
}
