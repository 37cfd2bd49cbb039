use shared::{
    error::FetchError,
    http::{FetchRequest, HttpResponse},
};
use storage::{CacheStorage, CacheStore};
use tracing::{debug, warn};
use url::Url;

use crate::fetch::Fetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// External API: live fetch, stored on success, cache only as a fallback.
    NetworkFirst,
    /// Everything else: any store first, live fetch on a miss, never stored.
    CacheFirst,
}

impl CachePolicy {
    pub fn for_request(request: &FetchRequest, api_host: &str) -> Self {
        if is_api_origin(&request.url, api_host) {
            CachePolicy::NetworkFirst
        } else {
            CachePolicy::CacheFirst
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub response: HttpResponse,
    pub source: ResponseSource,
}

fn is_api_origin(url: &Url, api_host: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let api_host = api_host.to_ascii_lowercase();
    host == api_host || host.ends_with(&format!(".{api_host}"))
}

pub(crate) async fn network_first(
    network: &dyn Fetcher,
    api_cache: &CacheStore,
    request: FetchRequest,
) -> Result<Resolved, FetchError> {
    let key = request.key();
    match network.fetch(request).await {
        Ok(response) => {
            if let Err(error) = api_cache.put(&key, &response).await {
                warn!(%key, cache = api_cache.name(), %error, "failed to store api response");
            }
            Ok(Resolved {
                response,
                source: ResponseSource::Network,
            })
        }
        Err(network_error) => {
            debug!(%key, error = %network_error, "network failed, trying api cache");
            let cached = match api_cache.match_request(&key).await {
                Ok(cached) => cached,
                Err(error) => {
                    warn!(%key, cache = api_cache.name(), %error, "api cache lookup failed");
                    None
                }
            };
            cached
                .map(|cached| Resolved {
                    response: cached.response,
                    source: ResponseSource::Cache,
                })
                .ok_or(network_error)
        }
    }
}

pub(crate) async fn cache_first(
    network: &dyn Fetcher,
    storage: &CacheStorage,
    request: FetchRequest,
) -> Result<Resolved, FetchError> {
    let key = request.key();
    match storage.match_any(&key).await {
        Ok(Some(cached)) => {
            debug!(%key, cache = %cached.cache_name, "served from cache");
            return Ok(Resolved {
                response: cached.response,
                source: ResponseSource::Cache,
            });
        }
        Ok(None) => {}
        Err(error) => warn!(%key, %error, "cache lookup failed, going to network"),
    }

    let response = network.fetch(request).await?;
    Ok(Resolved {
        response,
        source: ResponseSource::Network,
    })
}
