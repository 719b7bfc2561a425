use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{
    app::{models::api_error::ApiError, structs::json_from_request::JsonFromRequest},
    transactions::models::transaction::Transaction,
    AppState,
};

use super::models::scoring_result::ScoringResult;

pub async fn score_transaction(
    State(state): State<Arc<AppState>>,
    JsonFromRequest(transaction): JsonFromRequest<Transaction>,
) -> Result<Json<ScoringResult>, ApiError> {
    match state.scoring.score(transaction) {
        Ok(result) => Ok(Json(result)),
        Err(e) => Err(e),
    }
}
