use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::{
    application::{
        dispatcher::{Dispatch, dispatch},
        error::HttpError,
        reconciler::acknowledgment,
    },
    domain::interaction::{Interaction, RawInteraction},
};

use super::{
    AppState,
    ack::{deferred_response, pong_response},
};

const SOURCE: &str = "infra::http::interactions";

/// Entry point for signed interaction callbacks.
pub async fn receive_interaction(State(state): State<AppState>, body: Bytes) -> Response {
    let raw: RawInteraction = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Malformed interaction",
                &err,
            )
            .into_response();
        }
    };

    let interaction = match Interaction::classify(raw) {
        Ok(Some(interaction)) => interaction,
        Ok(None) => {
            debug!(
                target = "fortune_teller::interactions",
                "Ignoring interaction of unsupported type"
            );
            return StatusCode::NO_CONTENT.into_response();
        }
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Malformed interaction",
                &err,
            )
            .into_response();
        }
    };

    match dispatch(interaction) {
        Dispatch::Pong => pong_response(),
        Dispatch::Deferred(request) => {
            info!(
                target = "fortune_teller::interactions",
                interaction_id = %request.id,
                origin = request.origin.as_str(),
                user = request.user.as_ref().map(|user| user.as_str()).unwrap_or(""),
                "Deferring fortune"
            );
            let (signal, wait) = acknowledgment();
            state.reconciler.spawn(request, wait);
            deferred_response(signal)
        }
        Dispatch::Ignored(reason) => {
            debug!(
                target = "fortune_teller::interactions",
                reason = ?reason,
                "Ignoring interaction"
            );
            StatusCode::NO_CONTENT.into_response()
        }
    }
}
