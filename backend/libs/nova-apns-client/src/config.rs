use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::certificate::Certificate;
use crate::client::{Client, Endpoint};
use crate::client_cache::ClientCache;
use crate::env_utils::{non_empty_env, parse_env_with_default};
use crate::error::ConfigError;

/// Default upper bound on cached clients
pub const DEFAULT_MAX_ENTRIES: usize = 64;
/// Default lifetime of a cached client (10 minutes)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);

/// Client cache limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCacheConfig {
    /// Maximum resident clients; 0 keeps none
    pub max_entries: usize,
    /// Age at which a client is rebuilt; 0 rebuilds on every lookup
    #[serde(with = "duration_secs")]
    pub max_age: Duration,
}

impl Default for ClientCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl ClientCacheConfig {
    /// Load cache limits from environment variables
    ///
    /// Environment variables:
    /// - `APNS_CLIENT_CACHE_MAX_ENTRIES`: maximum cached clients (default: 64)
    /// - `APNS_CLIENT_CACHE_MAX_AGE_SECS`: client lifetime in seconds (default: 600)
    pub fn from_env() -> Self {
        let max_entries = parse_env_with_default("APNS_CLIENT_CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES);
        let max_age_secs =
            parse_env_with_default("APNS_CLIENT_CACHE_MAX_AGE_SECS", DEFAULT_MAX_AGE.as_secs());

        Self {
            max_entries,
            max_age: Duration::from_secs(max_age_secs),
        }
    }
}

/// APNs Configuration
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    pub certificate_path: String,
    pub certificate_passphrase: Option<String>,
    pub bundle_id: String,
    pub is_production: bool,
    pub cache: ClientCacheConfig,
}

impl ApnsConfig {
    /// Create new APNs configuration
    pub fn new(certificate_path: String, bundle_id: String, is_production: bool) -> Self {
        Self {
            certificate_path,
            certificate_passphrase: None,
            bundle_id,
            is_production,
            cache: ClientCacheConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Required variables:
    /// - `APNS_CERTIFICATE_PATH`: PKCS#12 or PEM certificate
    ///
    /// Optional:
    /// - `APNS_CERTIFICATE_PASSPHRASE`: certificate password
    /// - `APNS_BUNDLE_ID`: app bundle id used as topic (default: com.example.app)
    /// - `APNS_PRODUCTION`: use the production gateway (default: false)
    /// - cache limits, see [`ClientCacheConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let certificate_path =
            non_empty_env("APNS_CERTIFICATE_PATH").ok_or_else(|| ConfigError::MissingEnvVar {
                var_name: "APNS_CERTIFICATE_PATH".to_string(),
                hint: "Set to the APNs client certificate (.p12 or .pem)".to_string(),
            })?;

        let certificate_passphrase = std::env::var("APNS_CERTIFICATE_PASSPHRASE").ok();
        let bundle_id =
            non_empty_env("APNS_BUNDLE_ID").unwrap_or_else(|| "com.example.app".to_string());
        let is_production = parse_env_with_default("APNS_PRODUCTION", false);

        info!(
            certificate_path = %certificate_path,
            bundle_id = %bundle_id,
            production = is_production,
            "APNs configuration loaded"
        );

        Ok(Self {
            certificate_path,
            certificate_passphrase,
            bundle_id,
            is_production,
            cache: ClientCacheConfig::from_env(),
        })
    }

    /// Set certificate passphrase
    pub fn with_passphrase(mut self, passphrase: String) -> Self {
        self.certificate_passphrase = Some(passphrase);
        self
    }

    pub fn with_cache(mut self, cache: ClientCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Get APNs API endpoint based on environment
    pub fn endpoint(&self) -> &'static str {
        self.gateway().host()
    }

    pub fn gateway(&self) -> Endpoint {
        Endpoint::from_production_flag(self.is_production)
    }

    /// Client cache with the configured limits, building clients for the configured gateway
    pub fn client_cache(&self) -> ClientCache {
        ClientCache::with_factory(self.cache, Client::factory_for(self.gateway()))
    }

    /// Load the configured certificate, picking the container format by extension
    pub fn load_certificate(&self) -> Result<Certificate, ConfigError> {
        let password = self.certificate_passphrase.as_deref().unwrap_or("");
        Ok(Certificate::from_file(&self.certificate_path, password)?)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
