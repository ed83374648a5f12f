//! Nova APNs Client Library
//!
//! This library provides the certificate-authenticated client plumbing for the
//! Apple Push Notification Service (APNs) across the Nova platform.
//!
//! It handles:
//! - Loading client certificates from PKCS#12 archives and PEM bundles
//!   (including password protected keys)
//! - A bounded, concurrent cache of clients keyed by certificate identity, so
//!   TLS sessions are reused and rotated certificates get fresh clients
//! - Notification payload marshaling and gateway response decoding
//!
//! Construct one [`ClientCache`] at startup and share it by reference:
//!
//! ```rust,no_run
//! use nova_apns_client::{certificate, ClientCache};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cert = certificate::from_p12_file("/certs/push.p12", "")?;
//! let cache = ClientCache::new();
//! if let Some(client) = cache.get(&cert) {
//!     println!("sending via {}", client.host());
//! }
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod client;
pub mod client_cache;
pub mod config;
pub mod env_utils;
pub mod error;
pub mod notification;
pub mod response;

pub use certificate::{Certificate, CertificateFormat, CertificateId};
pub use client::{Client, Endpoint};
pub use client_cache::{ClientCache, Factory};
pub use config::{ApnsConfig, ClientCacheConfig};
pub use error::{CertificateError, CertificateErrorKind, ClientError, ConfigError, Material};
pub use notification::{Notification, Payload, Priority, PushType};
pub use response::{Response, STATUS_SENT};
