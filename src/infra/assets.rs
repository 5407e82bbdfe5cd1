//! Startup loading of the background and fortune catalogs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::info;

use crate::{
    config::AssetSettings,
    domain::catalog::{Catalogs, default_fortunes},
};

use super::error::InfraError;

const TEMPLATE_EXTENSIONS: &[&str] = &["png", "jpg"];

#[derive(Debug, Deserialize)]
struct FortunesFile {
    fortunes: Vec<String>,
}

/// Build the process-wide catalogs. Any empty catalog is a startup error.
pub fn load_catalogs(settings: &AssetSettings) -> Result<Catalogs, InfraError> {
    let backgrounds = list_templates(&settings.templates_dir)?;
    let fortunes = match settings.fortunes_file.as_deref() {
        Some(path) => read_fortunes(path)?,
        None => default_fortunes(),
    };

    info!(
        target = "fortune_teller::assets",
        templates_dir = %settings.templates_dir.display(),
        backgrounds = backgrounds.len(),
        fortunes = fortunes.len(),
        "Loaded fortune catalogs"
    );

    Catalogs::new(backgrounds, fortunes).map_err(|err| InfraError::configuration(err.to_string()))
}

/// List `.png`/`.jpg` files directly inside `dir`, sorted by file name.
pub fn list_templates(dir: &Path) -> Result<Vec<PathBuf>, InfraError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        InfraError::configuration(format!(
            "failed to read templates directory `{}`: {err}",
            dir.display()
        ))
    })?;

    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if is_template(&path) {
            templates.push(path);
        }
    }
    templates.sort();
    Ok(templates)
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            TEMPLATE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Read a TOML file of the form `fortunes = ["...", ...]`; blank entries are skipped.
pub fn read_fortunes(path: &Path) -> Result<Vec<String>, InfraError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        InfraError::configuration(format!(
            "failed to read fortunes file `{}`: {err}",
            path.display()
        ))
    })?;
    let file: FortunesFile = toml::from_str(&contents).map_err(|err| {
        InfraError::configuration(format!(
            "failed to parse fortunes file `{}`: {err}",
            path.display()
        ))
    })?;

    Ok(file
        .fortunes
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}
