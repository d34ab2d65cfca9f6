//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"detail": "..."}` with a status code chosen here.
//! Internal failures are logged in full and reported to the client generically.

use api_shared::dto::ErrorRes;
use api_shared::AuthError;
use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use epr_core::{PatientError, UniqueField};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn patient_not_found() -> Self {
        Self::NotFound("Patient not found".into())
    }

    pub fn export_job_not_found() -> Self {
        Self::NotFound("Export job not found".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::IdentifierFormat
            | PatientError::InvalidInput(_)
            | PatientError::Text(_)
            | PatientError::Uuid(_) => Self::BadRequest(err.to_string()),
            PatientError::DuplicateIdentifier
            | PatientError::UniqueConstraint(UniqueField::Fingerprint) => {
                Self::Conflict("Patient with this identifier already exists".into())
            }
            PatientError::PatientNotFound(_) => Self::patient_not_found(),
            PatientError::ExportJobNotFound(_) => Self::export_job_not_found(),
            PatientError::ExportNotReady(status) => {
                Self::BadRequest(format!("Export job status: {status}"))
            }
            PatientError::ExportFileMissing(_) => Self::NotFound("Export file not found".into()),
            other => {
                tracing::error!("internal error: {other}");
                Self::Internal("Internal server error".into())
            }
        }
    }
}

/// The rejection text quotes offending values, which may be identifiers, so only the status
/// is logged and the client gets a fixed message.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::info!(status = %rejection.status(), "rejected request body");
        Self::BadRequest("Invalid request body".into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::Auth(AuthError::Signing(e)) => {
                tracing::error!("token signing failed: {e}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorRes { detail })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epr_core::ExportStatus;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (PatientError::IdentifierFormat, StatusCode::BAD_REQUEST),
            (PatientError::DuplicateIdentifier, StatusCode::CONFLICT),
            (
                PatientError::UniqueConstraint(UniqueField::Fingerprint),
                StatusCode::CONFLICT,
            ),
            (
                PatientError::UniqueConstraint(UniqueField::Pseudonym),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (PatientError::PatientNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                PatientError::ExportNotReady(ExportStatus::Failed),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let response = ApiError::from(AuthError::MissingToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
