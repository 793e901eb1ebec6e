//! Prefix configuration cache
//!
//! Configs change rarely but are read on every issuance, so lookups are
//! cached for a short TTL and invalidated explicitly when a config is
//! written through this process.

use shared::models::PrefixConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::format::IdTemplate;

/// A config plus its template, parsed once at insert time
pub struct CachedConfig {
    pub config: PrefixConfig,
    pub template: IdTemplate,
}

struct CacheEntry {
    cached: Arc<CachedConfig>,
    expires_at: Instant,
}

/// TTL cache over prefix configurations
pub struct ConfigCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, prefix: &str) -> Option<Arc<CachedConfig>> {
        let entries = self.entries.read().await;
        entries
            .get(prefix)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.cached.clone())
    }

    pub async fn insert(&self, config: PrefixConfig) -> Arc<CachedConfig> {
        let template = IdTemplate::parse(&config.format_template);
        let cached = Arc::new(CachedConfig { config, template });
        let mut entries = self.entries.write().await;
        entries.insert(
            cached.config.prefix.clone(),
            CacheEntry {
                cached: cached.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        cached
    }

    /// Drop one prefix after its config has been written.
    pub async fn invalidate(&self, prefix: &str) {
        self.entries.write().await.remove(prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PrefixConfig;

    fn config(prefix: &str) -> PrefixConfig {
        PrefixConfig::with_defaults(prefix, None)
    }

    #[tokio::test]
    async fn test_hit_and_invalidate() {
        let cache = ConfigCache::new(Duration::from_secs(60));
        assert!(cache.get("SG").await.is_none());

        cache.insert(config("SG")).await;
        assert!(cache.get("SG").await.is_some());

        cache.invalidate("SG").await;
        assert!(cache.get("SG").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = ConfigCache::new(Duration::from_millis(10));
        cache.insert(config("SG")).await;
        assert!(cache.get("SG").await.is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get("SG").await.is_none());
    }

    #[tokio::test]
    async fn test_template_parsed_on_insert() {
        let cache = ConfigCache::new(Duration::from_secs(60));
        let mut cfg = config("INV");
        cfg.format_template = "INV%d-%04d".into();
        let cached = cache.insert(cfg).await;
        assert!(matches!(cached.template, IdTemplate::YearPadded { .. }));
    }
}
