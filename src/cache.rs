//! Per-tenant cache of compiled rule sets.
//!
//! Entry age is measured from the last load of the rule text. Before the
//! fetch TTL an entry is served as is. Between the fetch TTL and the set TTL
//! it is still served, and one background refresh reloads the text. From the
//! set TTL on, `get` reloads before serving. A reload recompiles only when
//! the text's digest changed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::config::CacheSettings;
use crate::error::RulesError;
use crate::source::RuleSource;
use crate::types::{RuleSet, RulesVersion};

/// Source of the current instant for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Gets served from a cached entry, refreshing or not.
    pub hits: u64,
    /// Gets that had to load rule text before answering.
    pub misses: u64,
    /// Loads that compiled the text.
    pub recompiles: u64,
    /// Loads whose text was unchanged, so the compiled set was kept.
    pub revalidations: u64,
    /// Background refreshes started.
    pub refreshes: u64,
    /// Tenants currently cached.
    pub entries: usize,
}

enum Freshness {
    Fresh,
    Refresh,
    Expired,
}

struct CacheEntry {
    rules: Arc<RuleSet>,
    loaded_at: Instant,
    refreshing: AtomicBool,
}

impl CacheEntry {
    fn new(rules: Arc<RuleSet>, now: Instant) -> Self {
        Self {
            rules,
            loaded_at: now,
            refreshing: AtomicBool::new(false),
        }
    }

    fn freshness(&self, now: Instant, settings: &CacheSettings) -> Freshness {
        let age = now.saturating_duration_since(self.loaded_at);
        if age >= settings.set_ttl() {
            Freshness::Expired
        } else if age >= settings.fetch_ttl() {
            Freshness::Refresh
        } else {
            Freshness::Fresh
        }
    }

    /// Claims the one refresh this entry gets.
    fn begin_refresh(&self) -> bool {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Changes whenever a tenant's entry is invalidated or the cache is dropped.
type Generation = (u64, u64);

#[derive(Default)]
struct Slots {
    entries: HashMap<String, Arc<CacheEntry>>,
    invalidations: HashMap<String, u64>,
    drops: u64,
}

impl Slots {
    fn generation(&self, tenant: &str) -> Generation {
        (self.drops, self.invalidations.get(tenant).copied().unwrap_or(0))
    }
}

struct Shared<S> {
    source: Arc<S>,
    slots: RwLock<Slots>,
    settings: RwLock<CacheSettings>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    recompiles: AtomicU64,
    revalidations: AtomicU64,
    refreshes: AtomicU64,
}

impl<S: RuleSource> Shared<S> {
    /// Loads the text and installs the result, unless the tenant was
    /// invalidated since `generation` was read. The result is returned
    /// either way.
    fn reload(
        &self,
        tenant: &str,
        existing: Option<&CacheEntry>,
        generation: Generation,
    ) -> Result<Arc<RuleSet>, RulesError> {
        let text = self.source.load(tenant)?;
        let version = RulesVersion::of(&text);

        let rules = match existing {
            Some(entry) if entry.rules.version() == version => {
                self.revalidations.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(tenant = %tenant, version = %version, "circulation rules unchanged");
                Arc::clone(&entry.rules)
            }
            _ => {
                let rules = RuleSet::from_text(&text).map_err(|e| {
                    tracing::warn!(tenant = %tenant, error = %e, "stored circulation rules do not compile");
                    e
                })?;
                self.recompiles.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    tenant = %tenant,
                    version = %version,
                    lines = rules.len(),
                    "compiled circulation rules"
                );
                Arc::new(rules)
            }
        };

        let now = self.clock.now();
        let mut slots = self.slots.write();
        if slots.generation(tenant) == generation {
            slots
                .entries
                .insert(tenant.to_owned(), Arc::new(CacheEntry::new(Arc::clone(&rules), now)));
        } else {
            tracing::debug!(tenant = %tenant, "circulation rules invalidated during reload, not cached");
        }
        Ok(rules)
    }
}

/// Compiled rule sets keyed by tenant, loaded lazily from a [`RuleSource`].
///
/// Readers share `Arc<RuleSet>` snapshots. Two threads missing on the same
/// tenant may both compile; the last one to finish installs its entry. A
/// reload that started before an [`invalidate()`](Self::invalidate) or
/// [`drop_all()`](Self::drop_all) answers its caller but is not cached.
pub struct RulesCache<S: RuleSource> {
    shared: Arc<Shared<S>>,
}

impl<S: RuleSource> RulesCache<S> {
    pub fn new(source: Arc<S>, settings: CacheSettings) -> Self {
        Self::with_clock(source, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<S>, settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                slots: RwLock::new(Slots::default()),
                settings: RwLock::new(settings),
                clock,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                recompiles: AtomicU64::new(0),
                revalidations: AtomicU64::new(0),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// The compiled rules of `tenant`.
    ///
    /// A missing or expired entry is loaded and compiled before returning.
    /// An entry past the fetch TTL is returned as is, and a background
    /// thread reloads it once; if that reload fails the entry is served
    /// until it expires.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Source`] when the text cannot be loaded, or a
    /// parse or compile error when it does not compile. A cached entry is
    /// left in place on failure.
    pub fn get(&self, tenant: &str) -> Result<Arc<RuleSet>, RulesError> {
        let shared = &self.shared;
        let now = shared.clock.now();
        let settings = *shared.settings.read();
        let (existing, generation) = {
            let slots = shared.slots.read();
            (slots.entries.get(tenant).cloned(), slots.generation(tenant))
        };

        if let Some(entry) = &existing {
            match entry.freshness(now, &settings) {
                Freshness::Fresh => {
                    shared.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(&entry.rules));
                }
                Freshness::Refresh => {
                    shared.hits.fetch_add(1, Ordering::Relaxed);
                    if entry.begin_refresh() {
                        self.spawn_refresh(tenant, Arc::clone(entry), generation);
                    }
                    return Ok(Arc::clone(&entry.rules));
                }
                Freshness::Expired => {}
            }
        }

        shared.misses.fetch_add(1, Ordering::Relaxed);
        shared.reload(tenant, existing.as_deref(), generation)
    }

    fn spawn_refresh(&self, tenant: &str, entry: Arc<CacheEntry>, generation: Generation) {
        self.shared.refreshes.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let owned = tenant.to_owned();
        let claimed = Arc::clone(&entry);
        let spawned = thread::Builder::new()
            .name("circulation-rules-refresh".to_owned())
            .spawn(move || {
                if let Err(e) = shared.reload(&owned, Some(&*claimed), generation) {
                    tracing::warn!(tenant = %owned, error = %e, "circulation rules refresh failed");
                }
            });
        if let Err(e) = spawned {
            entry.refreshing.store(false, Ordering::Release);
            tracing::warn!(tenant = %tenant, error = %e, "could not start circulation rules refresh");
        }
    }

    /// Drop the entry of `tenant`; the next `get` reloads.
    pub fn invalidate(&self, tenant: &str) {
        let mut slots = self.shared.slots.write();
        *slots.invalidations.entry(tenant.to_owned()).or_default() += 1;
        if slots.entries.remove(tenant).is_some() {
            tracing::debug!(tenant = %tenant, "invalidated circulation rules");
        }
    }

    pub fn drop_all(&self) {
        let mut slots = self.shared.slots.write();
        let dropped = slots.entries.len();
        slots.entries.clear();
        slots.invalidations.clear();
        slots.drops += 1;
        tracing::debug!(dropped, "dropped all cached circulation rules");
    }

    /// Replace both TTLs. Existing entries are judged by the new values from
    /// the next `get` on.
    pub fn set_ttl(&self, set_ttl: Duration, fetch_ttl: Duration) {
        let settings = CacheSettings::new(set_ttl, fetch_ttl);
        *self.shared.settings.write() = settings;
        tracing::debug!(
            set_ttl_ms = settings.set_ttl_ms,
            fetch_ttl_ms = settings.fetch_ttl_ms,
            "cache ttl changed"
        );
    }

    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        *self.shared.settings.read()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let shared = &self.shared;
        CacheStats {
            hits: shared.hits.load(Ordering::Relaxed),
            misses: shared.misses.load(Ordering::Relaxed),
            recompiles: shared.recompiles.load(Ordering::Relaxed),
            revalidations: shared.revalidations.load(Ordering::Relaxed),
            refreshes: shared.refreshes.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    #[must_use]
    pub fn contains(&self, tenant: &str) -> bool {
        self.shared.slots.read().entries.contains_key(tenant)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.slots.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.slots.read().entries.is_empty()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.shared.source
    }
}

impl<S: RuleSource> fmt::Debug for RulesCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulesCache")
            .field("entries", &self.len())
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}
