use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, RulesCache};
use crate::config::CacheSettings;
use crate::error::RulesError;
use crate::source::RuleStorage;
use crate::types::{MatchReport, PolicyDecision, PolicyFamily, QueryParameters, RuleMatch, RuleSet, RulesVersion};

/// Per-tenant circulation rules: validated queries in, policy matches out.
///
/// Thread-safe; share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use circulation_rules::{CacheSettings, InMemoryRuleStorage, PolicyFamily, QueryParameters, RulesEngine};
///
/// let engine = RulesEngine::new(Arc::new(InMemoryRuleStorage::new()), CacheSettings::default());
/// engine
///     .replace_rule_text("diku", "priority: t, s, c, b, a, m, g\nfallback-policy: l lp-default\n", true)
///     .unwrap();
///
/// let params = QueryParameters::required(
///     "96d4bdf1-5fc2-40ef-9ace-6d7e3e48ec4d",
///     "2e6f51b9-d00a-4f1d-9960-49b1977acfca",
///     "0122feae-bd0e-4405-88de-525d93ba7cfd",
///     "6a475259-8a97-4992-a415-76440f5f7c23",
/// );
/// let matched = engine.apply_rules("diku", PolicyFamily::Loan, &params).unwrap();
/// assert_eq!(matched.policy_id(), "lp-default");
/// ```
#[derive(Debug)]
pub struct RulesEngine<S: RuleStorage> {
    storage: Arc<S>,
    cache: RulesCache<S>,
}

impl<S: RuleStorage> RulesEngine<S> {
    pub fn new(storage: Arc<S>, settings: CacheSettings) -> Self {
        Self {
            cache: RulesCache::new(Arc::clone(&storage), settings),
            storage,
        }
    }

    pub fn with_clock(storage: Arc<S>, settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: RulesCache::with_clock(Arc::clone(&storage), settings, clock),
            storage,
        }
    }

    /// The best match for one family.
    ///
    /// # Errors
    ///
    /// [`RulesError::Query`] for invalid parameters, checked before any rule
    /// is loaded; errors from loading or compiling the tenant's rules; and
    /// [`RulesError::NoMatch`] when no line assigns `family`.
    pub fn apply_rules(
        &self,
        tenant: &str,
        family: PolicyFamily,
        params: &QueryParameters,
    ) -> Result<RuleMatch, RulesError> {
        let query = params.validate()?;
        let rules = self.cache.get(tenant)?;
        let matched = rules
            .apply(&query, family)
            .ok_or(RulesError::NoMatch { family })?;
        tracing::debug!(
            tenant = %tenant,
            family = %family,
            policy = matched.policy_id(),
            line = matched.source_line(),
            "applied circulation rules"
        );
        Ok(matched)
    }

    /// Every matching line for one family, best first.
    ///
    /// # Errors
    ///
    /// As [`apply_rules()`](Self::apply_rules), except that an empty match
    /// list is not an error.
    pub fn apply_all_rules(
        &self,
        tenant: &str,
        family: PolicyFamily,
        params: &QueryParameters,
    ) -> Result<MatchReport, RulesError> {
        let query = params.validate()?;
        let rules = self.cache.get(tenant)?;
        Ok(rules.apply_detailed(&query, family))
    }

    /// The best match for all five families.
    ///
    /// # Errors
    ///
    /// As [`apply_rules()`](Self::apply_rules), for the first family without
    /// a match.
    pub fn apply_all_families(
        &self,
        tenant: &str,
        params: &QueryParameters,
    ) -> Result<PolicyDecision, RulesError> {
        let query = params.validate()?;
        let rules = self.cache.get(tenant)?;
        rules.decide(&query)
    }

    /// Compile `text` and, if it compiles, store it verbatim as the tenant's
    /// rules.
    ///
    /// Without `invalidate_cache` the previous rules keep being served until
    /// the cached entry expires.
    ///
    /// # Errors
    ///
    /// A parse or compile error with line and column; nothing is stored.
    /// [`RulesError::Source`] when the storage rejects the write.
    pub fn replace_rule_text(
        &self,
        tenant: &str,
        text: impl Into<String>,
        invalidate_cache: bool,
    ) -> Result<RulesVersion, RulesError> {
        let text = text.into();
        let version = match RuleSet::from_text(&text) {
            Ok(rules) => rules.version(),
            Err(e) => {
                tracing::warn!(tenant = %tenant, error = %e, "rejected circulation rules");
                return Err(e);
            }
        };
        self.storage.store(tenant, text)?;
        if invalidate_cache {
            self.cache.invalidate(tenant);
        }
        tracing::info!(
            tenant = %tenant,
            version = %version,
            invalidated = invalidate_cache,
            "stored circulation rules"
        );
        Ok(version)
    }

    /// The stored rule text, exactly as it was stored.
    ///
    /// # Errors
    ///
    /// [`RulesError::Source`] when the tenant has none or storage fails.
    pub fn rule_text(&self, tenant: &str) -> Result<String, RulesError> {
        Ok(self.storage.load(tenant)?)
    }

    /// The compiled rules the engine currently serves for `tenant`.
    ///
    /// # Errors
    ///
    /// As the cache's [`get()`](RulesCache::get).
    pub fn compiled_rules(&self, tenant: &str) -> Result<Arc<RuleSet>, RulesError> {
        self.cache.get(tenant)
    }

    pub fn set_cache_ttl(&self, set_ttl: Duration, fetch_ttl: Duration) {
        self.cache.set_ttl(set_ttl, fetch_ttl);
    }

    pub fn drop_cache(&self) {
        self.cache.drop_all();
    }

    #[must_use]
    pub fn cache(&self) -> &RulesCache<S> {
        &self.cache
    }
}
