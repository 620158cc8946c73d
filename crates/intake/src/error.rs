use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::intake::{CategoryError, MailError, PayloadError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Mail(MailError),
    Category(CategoryError),
    Payload(PayloadError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Mail(err) => write!(f, "mail setup error: {}", err),
            AppError::Category(err) => write!(f, "invalid submission: {}", err),
            AppError::Payload(err) => write!(f, "invalid submission: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Mail(err) => Some(err),
            AppError::Category(err) => Some(err),
            AppError::Payload(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Category(_) | AppError::Payload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MailError> for AppError {
    fn from(value: MailError) -> Self {
        Self::Mail(value)
    }
}

impl From<CategoryError> for AppError {
    fn from(value: CategoryError) -> Self {
        Self::Category(value)
    }
}

impl From<PayloadError> for AppError {
    fn from(value: PayloadError) -> Self {
        Self::Payload(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(PayloadError::Json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_errors_are_unprocessable_and_runtime_errors_are_internal() {
        let too_long = AppError::from(CategoryError::TooLong { length: 250, max: 64 });
        assert_eq!(too_long.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"));
        assert!(io.to_string().contains("in use"));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
