//! Lazily loaded, process-shared model slots.
//!
//! Both heavy collaborators (the generative text model and the neural speech
//! model) are loaded on first use and reused afterwards.  The slot serialises
//! the first load: concurrent first callers block on the one in-flight load
//! instead of loading twice.  A failed load is not cached, so the next call
//! tries again.

use std::time::Instant;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing::info;

type Loader<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

pub struct ResourcePool<T> {
    name: &'static str,
    loader: Loader<T>,
    slot: OnceCell<T>,
}

impl<T> ResourcePool<T> {
    pub fn new(name: &'static str, loader: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            name,
            loader: Box::new(loader),
            slot: OnceCell::new(),
        }
    }

    /// A pool whose loader always fails with `reason`.
    pub fn unavailable(name: &'static str, reason: &'static str) -> Self {
        Self::new(name, move || Err(anyhow::anyhow!("{reason}")))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Return the loaded resource, loading it first if needed.
    pub fn ensure_loaded(&self) -> Result<&T> {
        self.slot.get_or_try_init(|| {
            info!("Loading {} (first use)…", self.name);
            let t0 = Instant::now();
            let value = (self.loader)().with_context(|| format!("Failed to load {}", self.name))?;
            info!("{} loaded in {}ms", self.name, t0.elapsed().as_millis());
            Ok(value)
        })
    }
}

impl<T> std::fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn test_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = ResourcePool::new("counter", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(41 + 1)
        });
        assert!(!pool.is_loaded());
        assert_eq!(*pool.ensure_loaded().unwrap(), 42);
        assert_eq!(*pool.ensure_loaded().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(pool.is_loaded());
    }

    #[test]
    fn test_failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = ResourcePool::new("flaky", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("network down")
            }
            Ok("ready")
        });
        let err = pool.ensure_loaded().unwrap_err();
        assert!(format!("{err:#}").contains("network down"), "got: {err:#}");
        assert_eq!(*pool.ensure_loaded().unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = Arc::new(ResourcePool::new("slow", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(())
        }));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || pool.ensure_loaded().map(|_| ()).is_ok())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unavailable_reports_reason() {
        let pool: ResourcePool<()> = ResourcePool::unavailable("neural", "built without the neural feature");
        assert_eq!(pool.name(), "neural");
        let err = pool.ensure_loaded().unwrap_err();
        assert!(format!("{err:#}").contains("neural feature"), "got: {err:#}");
    }
}
