//! Bounded, concurrent cache of network clients keyed by certificate identity
//!
//! Establishing a TLS session with the gateway is expensive, so callers ask the
//! cache for a client bound to a [`Certificate`] instead of building one per
//! request. Entries expire after `max_age` (credential rotation) and the cache
//! never holds more than `max_entries` clients.
//!
//! All state lives behind a single mutex. The factory runs while that lock is
//! held, which serializes construction: concurrent `get` calls for one identity
//! never build more than one new client.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::certificate::{Certificate, CertificateId};
use crate::client::Client;
use crate::config::ClientCacheConfig;

/// Builds a client for a certificate; `None` means construction failed
///
/// The factory is called with the cache lock held and must not call back into
/// the cache.
pub type Factory<C> = Arc<dyn Fn(&Certificate) -> Option<C> + Send + Sync>;

struct CachedClientEntry<C> {
    client: C,
    created_at: Instant,
}

impl<C> CachedClientEntry<C> {
    fn new(client: C, now: Instant) -> Self {
        Self {
            client,
            created_at: now,
        }
    }

    fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= max_age
    }
}

struct CacheState<C> {
    entries: HashMap<CertificateId, CachedClientEntry<C>>,
    max_entries: usize,
    max_age: Duration,
    factory: Factory<C>,
}

impl<C> CacheState<C> {
    /// Evict until at most `bound` entries remain, stale entries first, then oldest first
    fn shrink_to(&mut self, bound: usize, now: Instant) {
        while self.entries.len() > bound {
            let max_age = self.max_age;
            let victim = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (!entry.is_stale(now, max_age), entry.created_at))
                .map(|(id, _)| *id);

            let Some(id) = victim else { break };
            self.entries.remove(&id);
            debug!(certificate_id = %id, "Evicted client from cache");
        }
    }

    /// Returns false when a zero bound leaves no room for the client
    fn insert(&mut self, id: CertificateId, client: C, now: Instant) -> bool {
        self.entries.remove(&id);
        if self.max_entries == 0 {
            return false;
        }

        self.shrink_to(self.max_entries - 1, now);
        self.entries.insert(id, CachedClientEntry::new(client, now));
        true
    }
}

/// Cache of clients keyed by [`CertificateId`]
///
/// `C` is whatever the factory produces; it is handed out by clone, so it
/// should be a cheap handle such as `Arc<Client>`.
pub struct ClientCache<C = Arc<Client>> {
    state: Mutex<CacheState<C>>,
}

impl ClientCache<Arc<Client>> {
    /// Cache with default limits that builds [`Client`]s for the development gateway
    pub fn new() -> Self {
        Self::with_config(ClientCacheConfig::default())
    }

    /// Cache with the given limits that builds [`Client`]s for the development gateway
    pub fn with_config(config: ClientCacheConfig) -> Self {
        Self::with_factory(config, Client::factory())
    }
}

impl Default for ClientCache<Arc<Client>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone> ClientCache<C> {
    pub fn with_factory(config: ClientCacheConfig, factory: Factory<C>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                max_entries: config.max_entries,
                max_age: config.max_age,
                factory,
            }),
        }
    }

    /// Return the cached client for `certificate`, building one if absent or stale
    ///
    /// Returns `None` when the factory cannot build a client; any stale entry
    /// for that identity is dropped in that case.
    pub fn get(&self, certificate: &Certificate) -> Option<C> {
        let id = certificate.id();
        let mut state = self.state.lock();
        let now = Instant::now();

        let mut stale = false;
        if let Some(entry) = state.entries.get(&id) {
            if !entry.is_stale(now, state.max_age) {
                debug!(certificate_id = %id, "Client cache hit");
                return Some(entry.client.clone());
            }
            stale = true;
        }

        let factory = Arc::clone(&state.factory);
        match factory(certificate) {
            Some(client) => {
                if stale {
                    debug!(certificate_id = %id, "Replacing stale client");
                } else {
                    debug!(certificate_id = %id, "Client cache miss, built new client");
                }
                if !state.insert(id, client.clone(), Instant::now()) {
                    debug!(certificate_id = %id, "Client not retained, cache bound is zero");
                }
                Some(client)
            }
            None => {
                warn!(certificate_id = %id, "Client factory returned no client");
                if state.entries.remove(&id).is_some() {
                    debug!(certificate_id = %id, "Dropped superseded client");
                }
                None
            }
        }
    }

    /// Register `client` for `certificate` without calling the factory
    ///
    /// Replaces any existing entry for the same identity.
    pub fn add(&self, client: C, certificate: &Certificate) {
        let id = certificate.id();
        let mut state = self.state.lock();
        if state.insert(id, client, Instant::now()) {
            debug!(certificate_id = %id, "Registered client");
        } else {
            debug!(certificate_id = %id, "Client not retained, cache bound is zero");
        }
    }

    /// Number of resident entries, including stale ones not yet replaced
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_factory(&self, factory: Factory<C>) {
        self.state.lock().factory = factory;
    }

    /// Lowering the bound evicts surplus entries immediately
    pub fn set_max_entries(&self, max_entries: usize) {
        let mut state = self.state.lock();
        state.max_entries = max_entries;
        state.shrink_to(max_entries, Instant::now());
    }

    pub fn set_max_age(&self, max_age: Duration) {
        self.state.lock().max_age = max_age;
    }

    pub fn max_entries(&self) -> usize {
        self.state.lock().max_entries
    }

    pub fn max_age(&self) -> Duration {
        self.state.lock().max_age
    }
}

impl<C> fmt::Debug for ClientCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClientCache")
            .field("len", &state.entries.len())
            .field("max_entries", &state.max_entries)
            .field("max_age", &state.max_age)
            .finish_non_exhaustive()
    }
}
