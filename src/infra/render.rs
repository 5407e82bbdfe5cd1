use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
    time::Instant,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    application::render::{RenderError, Renderer},
    config::{RenderSettings, TextBox},
};

/// Renders fortune cards by shelling out to ImageMagick.
#[derive(Debug, Clone)]
pub struct MagickRenderer {
    cli_path: PathBuf,
    font: PathBuf,
    point_size: u32,
    text_box: TextBox,
    fill: String,
}

impl From<&RenderSettings> for MagickRenderer {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            cli_path: settings.cli_path.clone(),
            font: settings.font.clone(),
            point_size: settings.point_size.get(),
            text_box: settings.text_box,
            fill: settings.fill.clone(),
        }
    }
}

impl MagickRenderer {
    fn arguments(&self, background: &Path, text: &str, output: &Path) -> Vec<OsString> {
        let TextBox {
            x,
            y,
            width,
            height,
        } = self.text_box;

        vec![
            background.as_os_str().to_owned(),
            "(".into(),
            "-size".into(),
            format!("{width}x{height}").into(),
            "-background".into(),
            "none".into(),
            "-fill".into(),
            self.fill.as_str().into(),
            "-font".into(),
            self.font.as_os_str().to_owned(),
            "-pointsize".into(),
            self.point_size.to_string().into(),
            "-gravity".into(),
            "center".into(),
            format!("caption:{}", escape_caption(text)).into(),
            ")".into(),
            "-gravity".into(),
            "northwest".into(),
            "-geometry".into(),
            format!("+{x}+{y}").into(),
            "-composite".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Renderer for MagickRenderer {
    async fn render(
        &self,
        background: &Path,
        text: &str,
        output: &Path,
    ) -> Result<(), RenderError> {
        let started_at = Instant::now();
        let result = Command::new(&self.cli_path)
            .args(self.arguments(background, text, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                warn!(
                    target = "fortune_teller::render",
                    op = "magick::render",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn_cli",
                    error = %err,
                    "Failed to spawn ImageMagick"
                );
                if err.kind() == ErrorKind::NotFound {
                    RenderError::NotFound(err)
                } else {
                    RenderError::Io(err)
                }
            })?;

        if !result.status.success() {
            let exit_code = result.status.code();
            let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
            warn!(
                target = "fortune_teller::render",
                op = "magick::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                error_code = "magick_cli",
                stderr = %stderr,
                "ImageMagick invocation failed"
            );
            return Err(RenderError::Cli { exit_code, stderr });
        }

        debug!(
            target = "fortune_teller::render",
            op = "magick::render",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            background = %background.display(),
            output = %output.display(),
            "Fortune card rendered"
        );
        Ok(())
    }
}

/// Make fortune text literal for `caption:`.
///
/// `%` starts a property escape and `\` escapes the next character, so both
/// are doubled. A leading `@` would read the caption from a file.
fn escape_caption(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 1);
    if text.starts_with('@') {
        escaped.push('\\');
    }
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '%' => escaped.push_str("%%"),
            other => escaped.push(other),
        }
    }
    escaped
}
