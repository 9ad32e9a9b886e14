use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{debug, info};

use crate::error::RouterError;

type Builder<T> = Box<dyn Fn() -> Result<T, RouterError> + Send + Sync>;

/// Lazily built, wholesale-replaced route table
///
/// Readers get an `Arc` snapshot, so a match that started before
/// [`invalidate`](RouteCache::invalidate) finishes against the old table. The
/// next [`get`](RouteCache::get) rebuilds. A build that overlaps an
/// invalidation is returned to its caller but not kept.
///
/// # Examples
///
/// ```
/// use vinext_router::cache::RouteCache;
///
/// let cache = RouteCache::new(|| Ok(vec!["/".to_string()]));
/// let first = cache.get().unwrap();
/// cache.invalidate();
/// let second = cache.get().unwrap();
/// assert_eq!(first, second);
/// assert!(!std::sync::Arc::ptr_eq(&first, &second));
/// ```
pub struct RouteCache<T> {
    current: ArcSwapOption<T>,
    generation: AtomicU64,
    build: Builder<T>,
}

impl<T> RouteCache<T> {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> Result<T, RouterError> + Send + Sync + 'static,
    {
        Self {
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            build: Box::new(build),
        }
    }

    /// Current table, building it if the cache is cold
    ///
    /// A failed build leaves the cache cold, so the next call retries.
    pub fn get(&self) -> Result<Arc<T>, RouterError> {
        if let Some(table) = self.current.load_full() {
            return Ok(table);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let table = Arc::new((self.build)()?);
        self.current.store(Some(Arc::clone(&table)));

        // An invalidation that landed mid-build saw the files before they changed.
        if self.generation.load(Ordering::SeqCst) != generation {
            let _ = self.current.compare_and_swap(&Some(Arc::clone(&table)), None);
            debug!("route table went stale while building; not cached");
            return Ok(table);
        }
        info!("route table built");
        Ok(table)
    }

    /// Drops the current table; the next `get` rebuilds
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.current.store(None);
    }

    pub fn is_built(&self) -> bool {
        self.current.load().is_some()
    }
}

impl<T> std::fmt::Debug for RouteCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCache")
            .field("built", &self.is_built())
            .finish()
    }
}
