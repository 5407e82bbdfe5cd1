use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use ed25519_dalek::{Signer, SigningKey};
use fortune_teller::{
    application::{
        followup::{ArtifactUpload, DeliveryError, FollowUpTransport},
        random::SeededRandom,
        reconciler::Reconciler,
        render::{RenderError, Renderer},
    },
    domain::{catalog::Catalogs, interaction::InteractionToken, payload::ResponsePayload},
    infra::{
        artifacts::ArtifactStore,
        http::{AppState, SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER, build_router},
    },
};
use serde_json::json;
use tower::ServiceExt;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

const TIMESTAMP: &str = "1700000000";

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn line_containing(&self, needle: &str) -> Option<String> {
        let buffer = self.0.lock().expect("log buffer");
        String::from_utf8_lossy(&buffer)
            .lines()
            .find(|line| line.contains(needle))
            .map(str::to_string)
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

struct FileRenderer;

#[async_trait]
impl Renderer for FileRenderer {
    async fn render(
        &self,
        _background: &Path,
        text: &str,
        output: &Path,
    ) -> Result<(), RenderError> {
        tokio::fs::write(output, text).await.map_err(RenderError::Io)
    }
}

struct AcceptingTransport;

#[async_trait]
impl FollowUpTransport for AcceptingTransport {
    async fn edit_original(
        &self,
        _token: &InteractionToken,
        _payload: &ResponsePayload,
        _upload: ArtifactUpload,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}

fn request_id(line: &str) -> &str {
    let start = line.find("request_id=").expect("request_id field") + "request_id=".len();
    let rest = &line[start..];
    let end = rest.find(['}', ' ']).unwrap_or(rest.len());
    &rest[..end]
}

#[tokio::test]
async fn follow_up_logs_carry_the_request_id() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().expect("tempdir");
    let artifacts =
        Arc::new(ArtifactStore::new(dir.path().join("artifacts")).expect("artifact store"));
    let catalogs = Catalogs::new(
        vec![PathBuf::from("templates/a.png")],
        vec!["Outlook good".to_string()],
    )
    .expect("catalogs");
    let reconciler = Reconciler::new(
        Arc::new(catalogs),
        Arc::new(SeededRandom::new(7)),
        Arc::new(FileRenderer),
        Arc::clone(&artifacts),
        Arc::new(AcceptingTransport),
    );
    let key = SigningKey::from_bytes(&[7u8; 32]);
    let router = build_router(AppState {
        verifier: Arc::new(SignatureVerifier::new(key.verifying_key())),
        reconciler: Arc::new(reconciler),
        body_limit: 64 * 1024,
    });

    let body = json!({
        "type": 2,
        "id": "T1",
        "token": "token-T1",
        "data": { "name": "fortune", "options": [] },
        "user": { "id": "U9" }
    })
    .to_string();
    let mut message = TIMESTAMP.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/interactions")
        .header(SIGNATURE_HEADER, hex::encode(key.sign(&message).to_bytes()))
        .header(TIMESTAMP_HEADER, TIMESTAMP)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("request");

    let response = router.oneshot(request).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("collect body");

    let delivered = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(line) = logs.line_containing("Fortune delivered") {
                return line;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("follow-up logged within timeout");
    let deferring = logs
        .line_containing("Deferring fortune")
        .expect("deferral logged");

    assert!(delivered.contains("followup{interaction_id=T1"), "{delivered}");
    assert!(!request_id(&deferring).is_empty());
    assert_eq!(request_id(&delivered), request_id(&deferring));
}
