//! TTL-bounded corpus cache.
//!
//! Loading the corpus means re-reading and re-parsing every JSON file, so
//! the loaded corpus is memoized for a bounded window. After the TTL the
//! corpus is rebuilt wholesale; it is never patched incrementally.
//!
//! The cache is an explicit object handed to request handlers, not module
//! state, and takes its notion of time from a [`Clock`] so tests can drive
//! expiry deterministically. The interior mutex is held across a reload,
//! which gives at-most-one reload even under concurrent callers; reloads
//! are idempotent either way.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::CorpusConfig;
use crate::loader;
use crate::models::Corpus;

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time, the production implementation.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    loaded_at: Instant,
    corpus: Arc<Corpus>,
}

/// Memoized corpus access with a time-to-live window.
pub struct CorpusCache {
    config: CorpusConfig,
    ttl: Duration,
    clock: Box<dyn Clock>,
    entry: Mutex<Option<CacheEntry>>,
}

impl CorpusCache {
    pub fn new(config: CorpusConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: CorpusConfig, clock: Box<dyn Clock>) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            config,
            ttl,
            clock,
            entry: Mutex::new(None),
        }
    }

    /// The current corpus, loading it on first use or after TTL expiry.
    ///
    /// Loader failures degrade to an empty corpus (logged by the loader),
    /// so this never blocks a request on a bad data directory.
    pub fn get(&self) -> Arc<Corpus> {
        let now = self.clock.now();
        let mut guard = self.entry.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = guard.as_ref() {
            if now.duration_since(entry.loaded_at) < self.ttl {
                return Arc::clone(&entry.corpus);
            }
        }

        let corpus = Arc::new(loader::load_corpus(&self.config));
        info!(chunks = corpus.len(), "corpus (re)loaded");
        *guard = Some(CacheEntry {
            loaded_at: now,
            corpus: Arc::clone(&corpus),
        });
        corpus
    }

    /// Drop the memoized corpus; the next `get` reloads from disk.
    pub fn invalidate(&self) {
        let mut guard = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock that only moves when the test advances it.
    struct FakeClock {
        origin: Instant,
        offset_secs: AtomicU64,
    }

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                origin: Instant::now(),
                offset_secs: AtomicU64::new(0),
            })
        }

        fn advance_secs(&self, secs: u64) {
            self.offset_secs.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for Arc<FakeClock> {
        fn now(&self) -> Instant {
            self.origin + Duration::from_secs(self.offset_secs.load(Ordering::SeqCst))
        }
    }

    fn test_config(dir: &Path, ttl_secs: u64) -> CorpusConfig {
        CorpusConfig {
            data_dir: dir.to_path_buf(),
            collection: "FEDEPALMA".to_string(),
            cache_ttl_secs: ttl_secs,
            min_leaf_len: 20,
            min_array_leaf_len: 10,
            max_content_len: 1500,
            min_content_len: 100,
            max_keywords: 10,
        }
    }

    fn write_doc(dir: &Path, name: &str, section: &str) {
        let body = format!(
            "Contenido de prueba sobre {} con longitud suficiente para superar los umbrales de carga del cargador de corpus",
            section
        );
        std::fs::write(
            dir.join(name),
            serde_json::to_string(&json!({ section: body })).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn calls_within_ttl_return_same_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        write_doc(tmp.path(), "uno.json", "primera");

        let clock = FakeClock::new();
        let cache = CorpusCache::with_clock(
            test_config(tmp.path(), 300),
            Box::new(Arc::clone(&clock)),
        );

        let first = cache.get();
        // New file on disk is invisible until expiry: same Arc comes back.
        write_doc(tmp.path(), "dos.json", "segunda");
        clock.advance_secs(299);
        let second = cache.get();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn expiry_triggers_exactly_one_wholesale_reload() {
        let tmp = tempfile::tempdir().unwrap();
        write_doc(tmp.path(), "uno.json", "primera");

        let clock = FakeClock::new();
        let cache = CorpusCache::with_clock(
            test_config(tmp.path(), 300),
            Box::new(Arc::clone(&clock)),
        );

        let first = cache.get();
        assert_eq!(first.len(), 1);

        write_doc(tmp.path(), "dos.json", "segunda");
        clock.advance_secs(301);

        let reloaded = cache.get();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.len(), 2);

        // Still within the fresh window: no further reload.
        let again = cache.get();
        assert!(Arc::ptr_eq(&reloaded, &again));
    }

    #[test]
    fn invalidate_forces_reload() {
        let tmp = tempfile::tempdir().unwrap();
        write_doc(tmp.path(), "uno.json", "primera");

        let cache = CorpusCache::new(test_config(tmp.path(), 300));
        let first = cache.get();

        write_doc(tmp.path(), "dos.json", "segunda");
        cache.invalidate();

        let second = cache.get();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn empty_directory_is_a_normal_empty_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(test_config(tmp.path(), 300));
        assert!(cache.get().is_empty());
    }
}
