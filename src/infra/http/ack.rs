//! Response body that reports when the deferred acknowledgment was written.

use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    Json,
    body::{Body, Bytes},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use http_body::{Frame, SizeHint};
use http_body_util::Full;

use crate::{application::reconciler::AckSignal, domain::payload::InteractionResponse};

/// Wraps a fixed body and fires an [`AckSignal`] once its last frame is
/// yielded to the server. Dropping the body unsent drops the signal instead.
#[derive(Debug)]
pub struct AckBody {
    inner: Full<Bytes>,
    signal: Option<AckSignal>,
}

impl AckBody {
    pub fn new(bytes: Bytes, signal: AckSignal) -> Self {
        Self {
            inner: Full::new(bytes),
            signal: Some(signal),
        }
    }

    fn fire(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.accepted();
        }
    }
}

impl http_body::Body for AckBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.fire(),
            Poll::Ready(Some(_)) if http_body::Body::is_end_stream(&this.inner) => this.fire(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        http_body::Body::is_end_stream(&self.inner)
    }

    fn size_hint(&self) -> SizeHint {
        http_body::Body::size_hint(&self.inner)
    }
}

/// `{"type":5}`, releasing the follow-up once it has been sent.
pub fn deferred_response(signal: AckSignal) -> Response {
    let body = match serde_json::to_vec(&InteractionResponse::deferred()) {
        Ok(bytes) => Bytes::from(bytes),
        Err(_) => Bytes::from_static(br#"{"type":5}"#),
    };

    let mut response = Response::new(Body::new(AckBody::new(body, signal)));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

pub fn pong_response() -> Response {
    Json(InteractionResponse::pong()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reconciler::acknowledgment;

    #[tokio::test]
    async fn signal_fires_once_body_is_collected() {
        let (signal, wait) = acknowledgment();
        let response = deferred_response(signal);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("collect body");
        assert_eq!(&bytes[..], br#"{"type":5}"#);
        assert!(wait.accepted().await);
    }

    #[tokio::test]
    async fn dropped_body_never_acknowledges() {
        let (signal, wait) = acknowledgment();
        drop(deferred_response(signal));
        assert!(!wait.accepted().await);
    }

    #[tokio::test]
    async fn pong_serializes_type_one() {
        let bytes = axum::body::to_bytes(pong_response().into_body(), usize::MAX)
            .await
            .expect("collect body");
        assert_eq!(&bytes[..], br#"{"type":1}"#);
    }
}
