use crate::app::models::api_error::ApiError;
use axum::Json;
use axum_macros::FromRequest;

/// JSON body extractor whose rejections render as [`ApiError`], so a
/// malformed payload is turned away before any handler logic runs.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonFromRequest<T>(pub T);
