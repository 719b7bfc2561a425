use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    BoxError, Router,
};
use tower::{
    buffer::BufferLayer,
    limit::RateLimitLayer,
    load_shed::{error::Overloaded, LoadShedLayer},
    ServiceBuilder,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{scoring, AppState};

use super::{controller, envy::Envy, errors::DefaultApiError, models::api_error::ApiError};

pub fn build(state: AppState, envy: &Envy) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/health", get(controller::get_health))
        .route(
            "/score-transaction",
            post(scoring::controller::score_transaction),
        )
        .layer(DefaultBodyLimit::max(envy.body_limit_bytes()))
        .with_state(Arc::new(state));

    // a single limiter in front of every route, over-limit requests get a 503
    let app = match envy.rate_limit_per_second {
        Some(per_second) => {
            let limited = ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_rate_limit_error))
                .layer(BufferLayer::<Request<Body>>::new(1024))
                .layer(LoadShedLayer::new())
                .layer(RateLimitLayer::new(per_second as u64, Duration::from_secs(1)))
                .service(routes);

            Router::new().fallback_service(limited)
        }
        None => routes,
    };

    // layers
    app.layer(cors).layer(TraceLayer::new_for_http())
}

async fn handle_rate_limit_error(err: BoxError) -> ApiError {
    if err.is::<Overloaded>() {
        tracing::warn!("request rejected by rate limiter");
    } else {
        tracing::error!(%err, "rate limiter failed");
    }

    DefaultApiError::ServiceUnavailable.value()
}
