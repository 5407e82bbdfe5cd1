//! Temporary rendered-image files, one per handled interaction.
//!
//! [`ArtifactStore::create`] reserves the storage key for an interaction and
//! returns an [`Artifact`] guard. The guard is released through
//! [`Artifact::dispose`]; a guard dropped without being disposed removes its
//! file synchronously, so no exit path leaves a file behind.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::warn;

use crate::{
    application::render::{RenderError, Renderer},
    domain::fortune::FortuneArtifact,
};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("artifact i/o failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    disposed: AtomicU64,
}

/// Snapshot of artifact lifecycle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactStats {
    pub created: u64,
    pub disposed: u64,
}

impl ArtifactStats {
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.disposed)
    }
}

/// Filesystem namespace for in-flight artifacts.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    counters: Arc<Counters>,
}

impl ArtifactStore {
    /// Initialise the store rooted at `root`, creating the directory if necessary.
    pub fn new(root: PathBuf) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve the storage key for `fortune`. Nothing is written until
    /// [`Artifact::render`] runs.
    pub fn create(&self, fortune: FortuneArtifact) -> Artifact {
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        let path = self.root.join(&fortune.storage_ref);
        Artifact {
            fortune,
            path,
            counters: Arc::clone(&self.counters),
            disposed: false,
        }
    }

    pub fn stats(&self) -> ArtifactStats {
        ArtifactStats {
            created: self.counters.created.load(Ordering::Relaxed),
            disposed: self.counters.disposed.load(Ordering::Relaxed),
        }
    }
}

/// Scoped handle over one artifact file.
#[derive(Debug)]
pub struct Artifact {
    fortune: FortuneArtifact,
    path: PathBuf,
    counters: Arc<Counters>,
    disposed: bool,
}

impl Artifact {
    pub fn fortune(&self) -> &FortuneArtifact {
        &self.fortune
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.fortune.storage_ref
    }

    /// Materialise the artifact by compositing its text over its background.
    pub async fn render(&self, renderer: &dyn Renderer) -> Result<(), ArtifactError> {
        renderer
            .render(&self.fortune.background_ref, &self.fortune.text, &self.path)
            .await?;
        Ok(())
    }

    /// Read the rendered bytes for upload.
    pub async fn open(&self) -> Result<Bytes, ArtifactError> {
        let data = fs::read(&self.path).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the backing file. Missing files are treated as success.
    pub async fn dispose(mut self) -> Result<(), ArtifactError> {
        let removed = match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ArtifactError::Io(err)),
        };
        self.mark_disposed();
        removed
    }

    fn mark_disposed(&mut self) {
        self.disposed = true;
        self.counters.disposed.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        self.mark_disposed();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                target = "fortune_teller::artifacts",
                path = %self.path.display(),
                error = %err,
                "Failed to remove artifact released without dispose"
            ),
        }
    }
}
