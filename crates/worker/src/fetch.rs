use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::FetchError,
    http::{FetchRequest, HttpResponse, Method},
};

/// Anything that can turn a request into a response: the live network, or a
/// worker that intercepts the request first.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, FetchError>;
}

#[derive(Clone, Default)]
pub struct ReqwestNetwork {
    http: Client,
}

impl ReqwestNetwork {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for ReqwestNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, FetchError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
        };
        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| FetchError::network(request.url.as_str(), e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(request.url.as_str(), e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// A network where every request fails, for browsing from the caches only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

#[async_trait]
impl Fetcher for OfflineNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, FetchError> {
        Err(FetchError::network(request.url.as_str(), "network is offline"))
    }
}
