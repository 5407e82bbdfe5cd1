mod ack;
mod interactions;
mod middleware;
pub mod signature;

pub use ack::{AckBody, deferred_response};
pub use signature::{SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER};

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::reconciler::Reconciler;

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub reconciler: Arc<Reconciler>,
    pub body_limit: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/interactions", post(interactions::receive_interaction))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            signature::verify_signature,
        ))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}
