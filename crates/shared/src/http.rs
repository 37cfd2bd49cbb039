use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            other => Err(format!("unsupported method '{other}'")),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request as the page issues it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
}

impl FetchRequest {
    pub fn get(url: &str) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            method: Method::Get,
            url,
        })
    }

    pub fn key(&self) -> RequestKey {
        RequestKey {
            method: self.method,
            url: self.url.to_string(),
        }
    }
}

/// Identity of a request inside a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_uses_normalized_url() {
        let request = FetchRequest::get("https://PokeAPI.co/api/v2/pokemon?limit=3").expect("url");
        let key = request.key();
        assert_eq!(key.method, Method::Get);
        assert_eq!(key.url, "https://pokeapi.co/api/v2/pokemon?limit=3");
        assert_eq!(key.to_string(), "GET https://pokeapi.co/api/v2/pokemon?limit=3");
    }

    #[test]
    fn stored_method_names_parse_back() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Get));
        assert_eq!(Method::Get.as_str().parse::<Method>(), Ok(Method::Get));
        assert!("POST".parse::<Method>().is_err());
    }

    #[test]
    fn rejects_relative_url() {
        let err = FetchRequest::get("/index.html").expect_err("relative url");
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut response = HttpResponse::new(200, b"{}".to_vec());
        response
            .headers
            .push(("Content-Type".into(), "application/json".into()));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.ok());
        assert!(!HttpResponse::new(404, Vec::new()).ok());
    }
}
