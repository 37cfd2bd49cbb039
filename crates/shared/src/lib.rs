//! Types shared between the Pokédex page, the request-interception worker and
//! the cache storage.

pub mod domain;
pub mod error;
pub mod http;
pub mod notification;
pub mod protocol;
