use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

/// Failure to fetch a tenant's rule text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("no circulation rules stored for tenant {tenant}")]
    NotFound { tenant: String },

    #[error("rule storage unavailable: {0}")]
    Unavailable(String),
}

/// Where the cache reads a tenant's rule text from. Background refreshes
/// call it from their own thread.
pub trait RuleSource: Send + Sync + 'static {
    /// The current rule text of `tenant`, exactly as stored.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] when the tenant has no rules,
    /// [`SourceError::Unavailable`] when the storage cannot be reached.
    fn load(&self, tenant: &str) -> Result<String, SourceError>;
}

/// A [`RuleSource`] that can also be written to.
pub trait RuleStorage: RuleSource {
    /// Replace the rule text of `tenant`, storing it verbatim.
    ///
    /// # Errors
    ///
    /// [`SourceError::Unavailable`] when the storage cannot be reached.
    fn store(&self, tenant: &str, text: String) -> Result<(), SourceError>;
}

/// Rule text kept in process memory, one entry per tenant.
#[derive(Debug, Default)]
pub struct InMemoryRuleStorage {
    texts: RwLock<HashMap<String, String>>,
}

impl InMemoryRuleStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tenant's rule text.
    #[must_use]
    pub fn with_tenant(self, tenant: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.write().insert(tenant.into(), text.into());
        self
    }

    #[must_use]
    pub fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self.texts.read().keys().cloned().collect();
        tenants.sort();
        tenants
    }
}

impl RuleSource for InMemoryRuleStorage {
    fn load(&self, tenant: &str) -> Result<String, SourceError> {
        self.texts
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                tenant: tenant.to_owned(),
            })
    }
}

impl RuleStorage for InMemoryRuleStorage {
    fn store(&self, tenant: &str, text: String) -> Result<(), SourceError> {
        self.texts.write().insert(tenant.to_owned(), text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_tenant() {
        let storage = InMemoryRuleStorage::new();
        assert_eq!(
            storage.load("diku"),
            Err(SourceError::NotFound {
                tenant: "diku".into()
            })
        );
    }

    #[test]
    fn store_is_verbatim() {
        let storage = InMemoryRuleStorage::new();
        let text = "priority: last-line\n\tfallback-policy: l x  \n";
        storage.store("diku", text.to_owned()).unwrap();
        assert_eq!(storage.load("diku").unwrap(), text);
    }

    #[test]
    fn tenants_are_separate() {
        let storage = InMemoryRuleStorage::new()
            .with_tenant("a", "one")
            .with_tenant("b", "two");
        assert_eq!(storage.load("a").unwrap(), "one");
        assert_eq!(storage.load("b").unwrap(), "two");
        assert_eq!(storage.tenants(), ["a", "b"]);
    }
}
