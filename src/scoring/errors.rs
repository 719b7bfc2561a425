use axum::http::StatusCode;

use crate::app::models::api_error::ApiError;

#[derive(Debug)]
pub enum ScoringApiError {
    InferenceFailed,
}

impl ScoringApiError {
    pub fn value(&self) -> ApiError {
        match *self {
            Self::InferenceFailed => ApiError {
                code: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Failed to score transaction.".to_string(),
            },
        }
    }
}
