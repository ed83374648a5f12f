use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Identity;
use tracing::{info, warn};

use crate::certificate::Certificate;
use crate::client_cache::Factory;
use crate::error::ClientError;

/// Development gateway host
pub const HOST_DEVELOPMENT: &str = "https://api.sandbox.push.apple.com";
/// Production gateway host
pub const HOST_PRODUCTION: &str = "https://api.push.apple.com";

/// Idle connections are kept this long before the pool drops them
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Gateway environment a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    #[default]
    Development,
    Production,
}

impl Endpoint {
    pub fn from_production_flag(is_production: bool) -> Self {
        if is_production {
            Endpoint::Production
        } else {
            Endpoint::Development
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            Endpoint::Development => HOST_DEVELOPMENT,
            Endpoint::Production => HOST_PRODUCTION,
        }
    }
}

/// HTTP/2 client that authenticates to the gateway with a client certificate
///
/// The underlying connection pool is shared between clones.
#[derive(Clone)]
pub struct Client {
    certificate: Certificate,
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl Client {
    /// Build a client for the development gateway presenting `certificate`
    pub fn new(certificate: Certificate) -> Result<Self, ClientError> {
        let (chain_pem, key_pem) = certificate
            .to_pem_identity()
            .map_err(|e| ClientError::Identity(e.to_string()))?;

        let identity = Identity::from_pkcs8_pem(&chain_pem, &key_pem)
            .map_err(|e| ClientError::Identity(e.to_string()))?;

        let http = reqwest::Client::builder()
            .use_native_tls()
            .identity(identity)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        info!(
            certificate_id = %certificate.id(),
            "Initialized APNs client"
        );

        Ok(Self {
            certificate,
            endpoint: Endpoint::Development,
            http,
        })
    }

    /// Default [`ClientCache`](crate::ClientCache) factory
    ///
    /// Construction errors are logged and reported to the cache as "no client".
    pub fn factory() -> Factory<Arc<Client>> {
        Self::factory_for(Endpoint::Development)
    }

    /// Cache factory building clients bound to `endpoint`
    pub fn factory_for(endpoint: Endpoint) -> Factory<Arc<Client>> {
        Arc::new(move |certificate: &Certificate| match Client::new(certificate.clone()) {
            Ok(client) => Some(Arc::new(client.with_endpoint(endpoint))),
            Err(e) => {
                warn!(
                    certificate_id = %certificate.id(),
                    error = %e,
                    "Failed to build APNs client"
                );
                None
            }
        })
    }

    pub fn development(mut self) -> Self {
        self.endpoint = Endpoint::Development;
        self
    }

    pub fn production(mut self) -> Self {
        self.endpoint = Endpoint::Production;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn host(&self) -> &'static str {
        self.endpoint.host()
    }

    /// The pooled HTTP client, for sending requests built by the caller
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("certificate", &self.certificate)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
