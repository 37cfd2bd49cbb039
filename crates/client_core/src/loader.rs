use std::sync::Arc;

use futures::future::try_join_all;
use shared::{
    domain::{Species, SpeciesCollection, SpeciesId},
    error::FetchError,
    http::FetchRequest,
    protocol::{ListingEntry, ListingResponse},
};
use thiserror::Error;
use tracing::{error, info};
use worker::Fetcher;

pub const DEFAULT_API_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SPRITE_BASE_URL: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master";
/// Upper bound on the listing request; covers every species the API serves.
pub const DEFAULT_LISTING_LIMIT: u32 = 1292;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch the species listing: {0}")]
    Transport(#[from] FetchError),
    #[error("species listing request returned status {0}")]
    Status(u16),
    #[error("species listing is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot derive a species id for '{name}' from '{url}'")]
    InvalidEntry { name: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub api_base_url: String,
    pub sprite_base_url: String,
    pub listing_limit: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            sprite_base_url: DEFAULT_SPRITE_BASE_URL.into(),
            listing_limit: DEFAULT_LISTING_LIMIT,
        }
    }
}

impl LoaderConfig {
    pub fn listing_url(&self) -> String {
        format!(
            "{}/pokemon?limit={}",
            self.api_base_url.trim_end_matches('/'),
            self.listing_limit
        )
    }

    pub fn image_url(&self, id: SpeciesId) -> String {
        format!(
            "{}/sprites/pokemon/{id}.png",
            self.sprite_base_url.trim_end_matches('/')
        )
    }
}

#[derive(Clone)]
pub struct SpeciesLoader {
    fetcher: Arc<dyn Fetcher>,
    config: LoaderConfig,
}

impl SpeciesLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: LoaderConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetches the listing and derives every species from it. Any failure
    /// fails the whole load; a partial collection is never published.
    pub async fn load(&self) -> Result<SpeciesCollection, LoadError> {
        let url = self.config.listing_url();
        info!(%url, "fetching species listing");

        let response = self.fetcher.fetch(FetchRequest::get(&url)?).await?;
        if !response.ok() {
            error!(%url, status = response.status, "species listing request failed");
            return Err(LoadError::Status(response.status));
        }
        let listing: ListingResponse = serde_json::from_slice(&response.body)?;

        let config = &self.config;
        let species = try_join_all(
            listing
                .results
                .into_iter()
                .map(|entry| async move { derive_species(&entry, config) }),
        )
        .await?;

        info!(count = species.len(), "species listing loaded");
        Ok(species.into())
    }
}

fn derive_species(entry: &ListingEntry, config: &LoaderConfig) -> Result<Species, LoadError> {
    let id = species_id_from_url(&entry.url).ok_or_else(|| LoadError::InvalidEntry {
        name: entry.name.clone(),
        url: entry.url.clone(),
    })?;
    Ok(Species {
        id,
        name: capitalize(&entry.name),
        image_url: config.image_url(id),
    })
}

/// The id is the second-to-last `/` segment of the canonical reference, as in
/// `https://pokeapi.co/api/v2/pokemon/25/`.
pub fn species_id_from_url(url: &str) -> Option<SpeciesId> {
    let segments: Vec<&str> = url.split('/').collect();
    let segment = segments.len().checked_sub(2).map(|i| segments[i])?;
    segment
        .parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .map(SpeciesId)
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
