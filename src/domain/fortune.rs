use std::path::PathBuf;

use super::interaction::InteractionId;

/// Description of one rendered fortune card.
///
/// `storage_ref` is the artifact file name, derived from the interaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FortuneArtifact {
    pub interaction_id: InteractionId,
    pub background_ref: PathBuf,
    pub text: String,
    pub storage_ref: String,
}

impl FortuneArtifact {
    pub fn new(interaction_id: InteractionId, background_ref: PathBuf, text: String) -> Self {
        let storage_ref = interaction_id.artifact_file_name();
        Self {
            interaction_id,
            background_ref,
            text,
            storage_ref,
        }
    }
}
