use std::{fs, io, path::Path};

use anyhow::Context;
use client_core::loader::{
    LoaderConfig, DEFAULT_API_BASE_URL, DEFAULT_LISTING_LIMIT, DEFAULT_SPRITE_BASE_URL,
};
use serde::Deserialize;
use url::Url;
use worker::DEFAULT_API_HOST;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub sprite_base_url: String,
    pub listing_limit: u32,
    pub cache_database_url: String,
    pub shell_origin: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            sprite_base_url: DEFAULT_SPRITE_BASE_URL.into(),
            listing_limit: DEFAULT_LISTING_LIMIT,
            cache_database_url: "sqlite://./data/pokedex-cache.db".into(),
            shell_origin: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            api_base_url: self.api_base_url.clone(),
            sprite_base_url: self.sprite_base_url.clone(),
            listing_limit: self.listing_limit,
        }
    }

    pub fn database_url(&self) -> String {
        normalize_database_url(&self.cache_database_url)
    }

    /// Host whose requests the worker treats as the external API.
    pub fn api_host(&self) -> String {
        Url::parse(&self.api_base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    sprite_base_url: Option<String>,
    listing_limit: Option<u32>,
    cache_database_url: Option<String>,
    shell_origin: Option<String>,
    log_filter: Option<String>,
}

/// Builds settings from defaults, the config file, then the environment.
/// A config file that cannot be read or parsed is skipped and its error handed
/// back so the caller can log it once tracing is up.
pub fn load_settings(path: &Path) -> (Settings, Option<anyhow::Error>) {
    let mut settings = Settings::default();

    let file_error = match read_file_settings(path) {
        Ok(Some(file_cfg)) => {
            apply_file(&mut settings, file_cfg);
            None
        }
        Ok(None) => None,
        Err(err) => Some(err),
    };

    apply_env(&mut settings, |key| std::env::var(key).ok());
    (settings, file_error)
}

fn read_file_settings(path: &Path) -> anyhow::Result<Option<FileSettings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    let file_cfg = toml::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(Some(file_cfg))
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.sprite_base_url {
        settings.sprite_base_url = v;
    }
    if let Some(v) = file_cfg.listing_limit {
        settings.listing_limit = v;
    }
    if let Some(v) = file_cfg.cache_database_url {
        settings.cache_database_url = v;
    }
    if let Some(v) = file_cfg.shell_origin {
        settings.shell_origin = Some(v);
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("POKEDEX__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("POKEDEX__SPRITE_BASE_URL") {
        settings.sprite_base_url = v;
    }
    if let Some(v) = lookup("POKEDEX__LISTING_LIMIT") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.listing_limit = parsed;
        }
    }
    if let Some(v) = lookup("POKEDEX__CACHE_DATABASE_URL") {
        settings.cache_database_url = v;
    }
    if let Some(v) = lookup("POKEDEX__SHELL_ORIGIN") {
        settings.shell_origin = Some(v);
    }
    if let Some(v) = lookup("POKEDEX__LOG_FILTER").or_else(|| lookup("RUST_LOG")) {
        settings.log_filter = v;
    }
}

/// Accepts a sqlite URL or a bare file path. The storage layer creates the
/// parent directory when it opens the database.
fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return Settings::default().cache_database_url;
    }
    if raw.contains("://") || raw.starts_with("sqlite::memory:") {
        return raw.to_string();
    }
    let path = raw.strip_prefix("sqlite:").unwrap_or(raw);
    format!("sqlite://{}", path.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
