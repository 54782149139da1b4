use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::model::leave_request::LeaveState;
use crate::repository::RepositoryError;

#[derive(Debug, Display)]
pub enum LeaveError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    /// The caller may not perform this transition.
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    #[display(fmt = "Cannot move a leave request from {} to {}", from, to)]
    InvalidTransition { from: LeaveState, to: LeaveState },
    /// The conditional write lost against a concurrent change.
    #[display(fmt = "Leave request {} was modified concurrently", _0)]
    Conflict(u64),
    /// No approver could be resolved for the requested stage.
    #[display(fmt = "{}", _0)]
    Configuration(String),
    #[display(fmt = "{}", _0)]
    Repository(RepositoryError),
}

impl std::error::Error for LeaveError {}

impl From<RepositoryError> for LeaveError {
    fn from(e: RepositoryError) -> Self {
        LeaveError::Repository(e)
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) => StatusCode::BAD_REQUEST,
            LeaveError::Unauthorized(_) => StatusCode::FORBIDDEN,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::InvalidTransition { .. } | LeaveError::Conflict(_) => StatusCode::CONFLICT,
            LeaveError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LeaveError::Repository(e) => {
                error!(error = %e, "Leave repository failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
