//! Request-interception worker.
//!
//! Runs as its own task next to the page. Every request the page issues
//! through a [`WorkerHandle`] is intercepted and resolved under a per-origin
//! cache policy, and display requests posted by the page become notifications.

pub mod fetch;
pub mod notifications;
pub mod policy;
mod runtime;

pub use fetch::{Fetcher, OfflineNetwork, ReqwestNetwork};
pub use notifications::{
    DisplayOutcome, NotificationCenter, NotificationPermissions, Notifier, TracingNotifier,
};
pub use policy::{CachePolicy, ResponseSource};
pub use runtime::{register, WorkerConfig, WorkerError, WorkerHandle, WorkerRegistration, WorkerState};

/// Store holding the pre-cached application shell.
pub const SHELL_CACHE: &str = "poke-cache-v1";
/// Store written by the network-first policy for the external API.
pub const API_CACHE: &str = "poke-cache";
pub const SHELL_RESOURCES: [&str; 2] = ["/", "/index.html"];
pub const DEFAULT_API_HOST: &str = "pokeapi.co";
