//! Process-level engine runtime.
//!
//! The native engine keeps registries that must be set up before the first
//! book exists and torn down after the last one is gone. [`Engine`] counts
//! live books through [`RuntimeLease`]s and drives those two transitions.
//! It also serializes every native call behind one gate.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gnc_config::BindingConfig;
use gnc_domain::SessionOpenMode;
use gnc_sys::NativeEngine;
use tracing::{debug, info};

use crate::book::Book;
use crate::error::{BindingError, Result};
use crate::lifeline::Lifeline;
use crate::session::Session;

struct EngineInner {
    native: Arc<dyn NativeEngine>,
    config: BindingConfig,
    gate: Mutex<()>,
    live_books: Mutex<usize>,
}

/// Cheap to clone; clones share the same runtime.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("native", &self.inner.native.label())
            .field("live_books", &self.live_books())
            .finish()
    }
}

impl Engine {
    pub fn new(native: Arc<dyn NativeEngine>) -> Self {
        Self::build(native, BindingConfig::default())
    }

    /// Fails with [`BindingError::Config`] if `config` does not validate.
    pub fn with_config(native: Arc<dyn NativeEngine>, config: BindingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(native, config))
    }

    fn build(native: Arc<dyn NativeEngine>, config: BindingConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                native,
                config,
                gate: Mutex::new(()),
                live_books: Mutex::new(0),
            }),
        }
    }

    /// A fresh in-process engine.
    #[cfg(feature = "sim")]
    pub fn simulated() -> Self {
        Self::new(Arc::new(gnc_sys::sim::SimEngine::new()))
    }

    /// The process-wide engine backed by `libgnc-engine`. The library keeps
    /// global state, so every caller shares one runtime. Fails only if the
    /// process's `LinkedEngine` was claimed directly through `gnc_sys`.
    #[cfg(feature = "linked")]
    pub fn linked() -> Result<Self> {
        static LINKED: once_cell::sync::OnceCell<Engine> = once_cell::sync::OnceCell::new();
        LINKED
            .get_or_try_init(|| {
                gnc_sys::linked::LinkedEngine::claim()
                    .map(|native| Engine::new(Arc::new(native)))
                    .ok_or_else(|| {
                        BindingError::InvalidArgument(
                            "the linked engine was already claimed outside Engine::linked".into(),
                        )
                    })
            })
            .cloned()
    }

    pub fn config(&self) -> &BindingConfig {
        &self.inner.config
    }

    pub fn native_label(&self) -> &'static str {
        self.inner.native.label()
    }

    /// Whether engine-wide state is currently set up.
    pub fn is_initialized(&self) -> bool {
        self.live_books() > 0
    }

    /// Books (session-owned or standalone) not yet released.
    pub fn live_books(&self) -> usize {
        *self.count()
    }

    pub fn open_session(&self, uri: &str, mode: SessionOpenMode) -> Result<Session> {
        Session::open(self, uri, mode)
    }

    /// Opens a store by name under the configured data directory, using the
    /// configured default mode.
    pub fn open_named(&self, name: &str) -> Result<Session> {
        if name.trim().is_empty() {
            return Err(BindingError::InvalidArgument(
                "store name must not be empty".into(),
            ));
        }
        let uri = self.inner.config.resolve_store_uri(name);
        Session::open(self, &uri, self.inner.config.default_open_mode)
    }

    /// A standalone book with no backing store. Released when dropped.
    pub fn new_book(&self) -> Result<Book> {
        let lease = self.lease();
        let raw = {
            let _gate = self.gate();
            self.native().book_new()
        };
        let book = std::ptr::NonNull::new(raw).ok_or(BindingError::InvalidHandle("book"))?;
        debug!(engine = self.native_label(), "standalone book created");
        Ok(Book::owning(Lifeline::new(self.clone(), book, lease)))
    }

    pub(crate) fn native(&self) -> &dyn NativeEngine {
        self.inner.native.as_ref()
    }

    pub(crate) fn gate(&self) -> MutexGuard<'_, ()> {
        self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.inner
            .live_books
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Must not be called while holding the gate.
    pub(crate) fn lease(&self) -> RuntimeLease {
        let _gate = self.gate();
        let mut live = self.count();
        if *live == 0 {
            self.native().engine_init();
            info!(engine = self.native_label(), "engine initialized");
        }
        *live += 1;
        RuntimeLease {
            engine: self.clone(),
        }
    }
}

/// One live book's claim on the engine runtime.
pub(crate) struct RuntimeLease {
    engine: Engine,
}

impl Drop for RuntimeLease {
    fn drop(&mut self) {
        let _gate = self.engine.gate();
        let mut live = self.engine.count();
        *live = live.saturating_sub(1);
        if *live == 0 {
            self.engine.native().engine_shutdown();
            info!(engine = self.engine.native_label(), "engine shut down");
        }
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use gnc_sys::sim::SimEngine;

    #[test]
    fn init_and_shutdown_follow_lease_count() {
        let sim = Arc::new(SimEngine::new());
        let engine = Engine::new(sim.clone());
        assert!(!engine.is_initialized());

        let first = engine.lease();
        let second = engine.lease();
        assert_eq!(sim.init_count(), 1);
        assert_eq!(engine.live_books(), 2);

        drop(first);
        assert_eq!(sim.shutdown_count(), 0);
        drop(second);
        assert_eq!(sim.shutdown_count(), 1);
        assert!(!engine.is_initialized());

        let _again = engine.lease();
        assert_eq!(sim.init_count(), 2);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = BindingConfig {
            log_filter: String::new(),
            ..BindingConfig::default()
        };
        let err = Engine::with_config(Arc::new(SimEngine::new()), config).unwrap_err();
        assert!(matches!(err, BindingError::Config(_)), "got {err:?}");

        let engine = Engine::with_config(Arc::new(SimEngine::new()), BindingConfig::default());
        assert!(engine.is_ok());
    }

    #[test]
    fn empty_store_names_are_rejected() {
        let engine = Engine::simulated();
        assert!(matches!(
            engine.open_named("  "),
            Err(BindingError::InvalidArgument(_))
        ));
    }
}
