//! Second phase of the deferred-response protocol.
//!
//! The HTTP handler answers every fortune request with a deferred placeholder.
//! [`Reconciler::spawn`] then runs the follow-up as a detached task: it waits
//! for the placeholder to be handed to the transport, renders a fresh card,
//! and edits the placeholder in place. Follow-up failures are logged and never
//! reach the original request.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    application::{
        dispatcher::FortuneRequest,
        embed::{build_fortune_embed, fortune_header},
        followup::{ArtifactUpload, DeliveryError, FollowUpTransport},
        random::{PickError, RandomSource, pick},
        render::Renderer,
    },
    domain::{catalog::Catalogs, fortune::FortuneArtifact},
    infra::artifacts::{Artifact, ArtifactError, ArtifactStore},
};

/// Fired once the deferred acknowledgment has been handed to the transport.
#[derive(Debug)]
pub struct AckSignal(oneshot::Sender<()>);

impl AckSignal {
    pub fn accepted(self) {
        let _ = self.0.send(());
    }
}

/// Awaited by the follow-up before it touches the interaction token.
#[derive(Debug)]
pub struct AckWait(oneshot::Receiver<()>);

impl AckWait {
    /// `true` when the acknowledgment went out, `false` when it was dropped.
    pub async fn accepted(self) -> bool {
        self.0.await.is_ok()
    }
}

pub fn acknowledgment() -> (AckSignal, AckWait) {
    let (tx, rx) = oneshot::channel();
    (AckSignal(tx), AckWait(rx))
}

#[derive(Debug, Error)]
pub enum FollowUpError {
    #[error("deferred acknowledgment was never delivered")]
    NotAcknowledged,
    #[error(transparent)]
    Pick(#[from] PickError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl FollowUpError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotAcknowledged => "not_acknowledged",
            Self::Pick(_) => "pick",
            Self::Artifact(ArtifactError::Render(_)) => "render",
            Self::Artifact(ArtifactError::Io(_)) => "artifact_io",
            Self::Delivery(_) => "delivery",
        }
    }
}

pub struct Reconciler {
    catalogs: Arc<Catalogs>,
    random: Arc<dyn RandomSource>,
    renderer: Arc<dyn Renderer>,
    artifacts: Arc<ArtifactStore>,
    transport: Arc<dyn FollowUpTransport>,
}

impl Reconciler {
    pub fn new(
        catalogs: Arc<Catalogs>,
        random: Arc<dyn RandomSource>,
        renderer: Arc<dyn Renderer>,
        artifacts: Arc<ArtifactStore>,
        transport: Arc<dyn FollowUpTransport>,
    ) -> Self {
        Self {
            catalogs,
            random,
            renderer,
            artifacts,
            transport,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run the follow-up for `request` as a detached task.
    ///
    /// The task runs in a `followup` span opened under the caller's current
    /// span, so its events keep the inbound request's id. The returned handle
    /// may be dropped; the task's outcome is only logged.
    pub fn spawn(self: &Arc<Self>, request: FortuneRequest, ack: AckWait) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        let span = info_span!(
            "followup",
            interaction_id = %request.id,
            origin = request.origin.as_str()
        );
        let task = async move {
            match reconciler.follow_up(request, ack).await {
                Ok(fortune) => {
                    counter!("fortune_followups_total", "result" => "delivered").increment(1);
                    info!(
                        target = "fortune_teller::followup",
                        background = %fortune.background_ref.display(),
                        "Fortune delivered"
                    );
                }
                Err(FollowUpError::NotAcknowledged) => {
                    counter!("fortune_followups_total", "result" => "not_acknowledged")
                        .increment(1);
                    warn!(
                        target = "fortune_teller::followup",
                        "Deferred acknowledgment was not delivered; skipping follow-up"
                    );
                }
                Err(err) => {
                    counter!("fortune_followups_total", "result" => err.code()).increment(1);
                    error!(
                        target = "fortune_teller::followup",
                        error_code = err.code(),
                        error = %err,
                        "Fortune follow-up failed"
                    );
                }
            }
        };
        tokio::spawn(task.instrument(span))
    }

    /// Wait for the acknowledgment, then render and deliver one fortune.
    ///
    /// Exactly one artifact is created per acknowledged request and it is
    /// disposed before this returns, whatever the outcome.
    pub async fn follow_up(
        &self,
        request: FortuneRequest,
        ack: AckWait,
    ) -> Result<FortuneArtifact, FollowUpError> {
        if !ack.accepted().await {
            return Err(FollowUpError::NotAcknowledged);
        }

        let background = pick(self.catalogs.backgrounds.as_slice(), self.random.as_ref())?;
        let text = pick(self.catalogs.fortunes.as_slice(), self.random.as_ref())?;
        let fortune = FortuneArtifact::new(request.id.clone(), background.clone(), text.clone());

        let artifact = self.artifacts.create(fortune.clone());
        let outcome = self.deliver(&request, &artifact).await;

        if let Err(err) = artifact.dispose().await {
            warn!(
                target = "fortune_teller::followup",
                interaction_id = %request.id,
                error = %err,
                "Failed to dispose fortune artifact"
            );
        }

        outcome.map(|()| fortune)
    }

    async fn deliver(
        &self,
        request: &FortuneRequest,
        artifact: &Artifact,
    ) -> Result<(), FollowUpError> {
        let started_at = Instant::now();
        artifact.render(self.renderer.as_ref()).await?;
        histogram!("fortune_render_ms").record(started_at.elapsed().as_secs_f64() * 1000.0);

        let bytes = artifact.open().await?;
        let header = fortune_header(
            request.user.as_ref(),
            request.question.as_deref(),
            OffsetDateTime::now_utc(),
        );
        let payload = build_fortune_embed(request.user.as_ref(), artifact.file_name(), header);
        let upload = ArtifactUpload {
            file_name: artifact.file_name().to_string(),
            bytes,
        };

        self.transport
            .edit_original(&request.token, &payload, upload)
            .await?;
        Ok(())
    }
}
