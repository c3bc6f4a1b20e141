//! Configuration-driven dispatch over several chat-completion backends.
//!
//! - [`config`] describes which backend to reach and how.
//! - [`providers`] holds one adapter per backend wire format.
//! - [`service`] keeps the active configuration and exposes `chat`.

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod providers;
pub mod service;

pub use config::{HttpConfig, Provider, ProviderConfig, ProviderSettings};
pub use error::{AiError, ErrorKind, Result};
pub use models::{ChatMessage, ChatResult, Completion, ProviderInfo, Role};
pub use providers::{AdapterRegistry, ProviderAdapter};
pub use service::{AiService, ConnectionReport};
