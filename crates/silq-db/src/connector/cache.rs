//! Bounded LRU cache of prepared statements, keyed by SQL text.
//!
//! Only read-only (`SELECT`) statements are cached. Connectors invalidate
//! the whole cache on reconnect and, through
//! [`StatementCache::before_execute`], whenever a DDL statement runs.

use indexmap::IndexMap;
use tracing::trace;

use crate::connector::is_query_type;

/// Counters kept by a [`StatementCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

/// LRU map from SQL text to a prepared statement handle.
///
/// Entries are ordered from least to most recently used. A capacity of 0
/// disables caching.
#[derive(Debug)]
pub struct StatementCache<H> {
    entries: IndexMap<String, H>,
    capacity: usize,
    stats: CacheStats,
}

/// Whether statements of this shape may be cached.
pub fn is_cacheable(sql: &str) -> bool {
    is_query_type(sql, &["select"])
}

impl<H: Clone> StatementCache<H> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, sql: &str) -> Option<H> {
        match self.entries.get_index_of(sql) {
            Some(index) => {
                let last = self.entries.len() - 1;
                self.entries.move_index(index, last);
                self.stats.hits += 1;
                self.entries.get_index(last).map(|(_, handle)| handle.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores a handle for a cacheable statement, evicting the least
    /// recently used entry when full.
    pub fn insert(&mut self, sql: &str, handle: H) {
        if self.capacity == 0 || !is_cacheable(sql) {
            return;
        }
        if self.entries.len() >= self.capacity && !self.entries.contains_key(sql) {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                trace!(sql = %evicted, "evicted prepared statement");
                self.stats.evictions += 1;
            }
        }
        self.entries.insert(sql.to_string(), handle);
        self.stats.inserts += 1;
    }

    /// Returns the cached handle for `sql`, preparing and caching it on a
    /// miss. Statements that are not cacheable are always prepared.
    pub fn prepare<E, F>(&mut self, sql: &str, prepare: F) -> Result<H, E>
    where
        F: FnOnce(&str) -> Result<H, E>,
    {
        if self.capacity > 0 && is_cacheable(sql) {
            if let Some(handle) = self.get(sql) {
                return Ok(handle);
            }
        }
        let handle = prepare(sql)?;
        self.insert(sql, handle.clone());
        Ok(handle)
    }

    /// Drops every cached handle.
    pub fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            trace!(entries = self.entries.len(), "invalidated statement cache");
        }
        self.entries.clear();
        self.stats.invalidations += 1;
    }

    /// Runs ahead of every statement: a schema change (`sql` leads with one
    /// of `ddl_keywords`) flushes the cache. Returns whether it did.
    pub fn before_execute<S: AsRef<str>>(&mut self, sql: &str, ddl_keywords: &[S]) -> bool {
        if !is_query_type(sql, ddl_keywords) {
            return false;
        }
        self.invalidate();
        true
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.entries.contains_key(sql)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use silq_config::ConnectorSettings;

    use super::*;

    /// Prepares through a counter so tests can see fresh prepares.
    fn prepare(cache: &mut StatementCache<usize>, prepares: &mut usize, sql: &str) -> usize {
        cache
            .prepare(sql, |_| {
                *prepares += 1;
                Ok::<_, Infallible>(*prepares)
            })
            .unwrap()
    }

    #[test]
    fn test_select_handle_is_reused() {
        let mut cache = StatementCache::new(8);
        let mut prepares = 0;

        let first = prepare(&mut cache, &mut prepares, "SELECT * FROM t");
        let second = prepare(&mut cache, &mut prepares, "SELECT * FROM t");
        assert_eq!(first, second);
        assert_eq!(prepares, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_writes_are_never_cached() {
        let mut cache = StatementCache::new(8);
        let mut prepares = 0;

        prepare(&mut cache, &mut prepares, "UPDATE t SET a = $1");
        prepare(&mut cache, &mut prepares, "UPDATE t SET a = $1");
        assert_eq!(prepares, 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_forces_fresh_prepare() {
        let mut cache = StatementCache::new(8);
        let mut prepares = 0;

        prepare(&mut cache, &mut prepares, "SELECT 1");
        prepare(&mut cache, &mut prepares, "select 2");
        assert_eq!(cache.len(), 2);

        cache.invalidate();
        assert!(cache.is_empty());

        prepare(&mut cache, &mut prepares, "SELECT 1");
        assert_eq!(prepares, 3);
    }

    #[test]
    fn test_only_schema_changes_flush_the_cache() {
        let settings = ConnectorSettings::default();
        let ddl = settings.ddl_keywords();
        let mut cache = StatementCache::new(8);
        let mut prepares = 0;

        prepare(&mut cache, &mut prepares, "SELECT 1");
        prepare(&mut cache, &mut prepares, "SELECT 2");
        for write in [
            "UPDATE t SET a = $1",
            "insert into t values ($1)",
            "DELETE FROM t",
            "SELECT 1",
        ] {
            assert!(!cache.before_execute(write, ddl), "{write}");
        }
        assert_eq!(cache.len(), 2);

        for schema in [
            "CREATE TABLE u (id int)",
            "  alter table t add column b int",
            "DROP TABLE u",
            "Truncate t",
        ] {
            prepare(&mut cache, &mut prepares, "SELECT 1");
            assert!(cache.before_execute(schema, ddl), "{schema}");
            assert!(cache.is_empty(), "{schema}");
        }

        prepare(&mut cache, &mut prepares, "SELECT 1");
        assert_eq!(prepares, 6);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let mut cache = StatementCache::new(2);
        let mut prepares = 0;

        prepare(&mut cache, &mut prepares, "SELECT 1");
        prepare(&mut cache, &mut prepares, "SELECT 2");
        // touch 1 so 2 becomes the oldest
        prepare(&mut cache, &mut prepares, "SELECT 1");
        prepare(&mut cache, &mut prepares, "SELECT 3");

        assert!(cache.contains("SELECT 1"));
        assert!(!cache.contains("SELECT 2"));
        assert!(cache.contains("SELECT 3"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = StatementCache::new(0);
        let mut prepares = 0;

        prepare(&mut cache, &mut prepares, "SELECT 1");
        prepare(&mut cache, &mut prepares, "SELECT 1");
        assert_eq!(prepares, 2);
        assert_eq!(cache.capacity(), 0);
    }
}
