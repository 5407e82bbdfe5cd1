//! Outbound seam for editing the deferred placeholder message.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::{interaction::InteractionToken, payload::ResponsePayload};

/// Rendered image attached to the edit as `files[0]`.
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to encode message payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("transport failure")]
    Transport {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("platform rejected edit with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait FollowUpTransport: Send + Sync {
    /// Replace the original response of the interaction identified by `token`.
    async fn edit_original(
        &self,
        token: &InteractionToken,
        payload: &ResponsePayload,
        upload: ArtifactUpload,
    ) -> Result<(), DeliveryError>;
}
