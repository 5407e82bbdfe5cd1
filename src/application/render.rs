use std::{io, path::Path};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    NotFound(io::Error),
    #[error("renderer i/o failed: {0}")]
    Io(io::Error),
    #[error("renderer invocation failed (exit {exit_code:?}): {stderr}")]
    Cli {
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Composites `text` over `background` and writes the image to `output`.
///
/// A failed render may leave a partial file at `output`; callers own cleanup.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, background: &Path, text: &str, output: &Path)
    -> Result<(), RenderError>;
}
