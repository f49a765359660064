//! Liveness tracking shared by a book and every view derived from it.
//!
//! Each open book owns one [`Lifeline`]. Views hold an `Arc` to it plus the
//! retirement flag shared by every view of the same address. A view may
//! reach native code only while the book is alive and its flag is unset.
//! Both checks run under the engine gate, so a concurrent close cannot slip
//! in between check and call.
//!
//! The book tracks one flag per address that still has views. Retiring an
//! address drops its entry, and entries whose views are all gone are swept
//! once the table doubles in size.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gnc_sys::{NativeEngine, QofBook};
use tracing::debug;

use crate::engine::{Engine, RuntimeLease};
use crate::error::{BindingError, Result};

pub(crate) struct Lifeline {
    engine: Engine,
    book: NonNull<QofBook>,
    alive: AtomicBool,
    flags: Mutex<FlagTable>,
    editing: Mutex<HashSet<usize>>,
    lease: Mutex<Option<RuntimeLease>>,
}

// The book pointer is only dereferenced by the engine, under the gate.
unsafe impl Send for Lifeline {}
unsafe impl Sync for Lifeline {}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Lifeline {
    pub fn new(engine: Engine, book: NonNull<QofBook>, lease: RuntimeLease) -> Arc<Self> {
        Arc::new(Self {
            engine,
            book,
            alive: AtomicBool::new(true),
            flags: Mutex::new(FlagTable::default()),
            editing: Mutex::new(HashSet::new()),
            lease: Mutex::new(Some(lease)),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Takes the gate and confirms the book is still open.
    pub fn enter(self: &Arc<Self>, kind: &'static str) -> Result<LiveBook<'_>> {
        let gate = self.engine.gate();
        if !self.is_alive() {
            debug!(kind, "rejected access through closed book");
            return Err(BindingError::StaleHandle(kind));
        }
        Ok(LiveBook {
            life: self,
            _gate: gate,
        })
    }

    /// Runs `teardown` exactly once and marks the book closed. Returns `None`
    /// if the book was already released.
    pub fn release<R>(&self, teardown: impl FnOnce(&dyn NativeEngine, *mut QofBook) -> R) -> Option<R> {
        let outcome = {
            let _gate = self.engine.gate();
            if !self.alive.swap(false, Ordering::SeqCst) {
                return None;
            }
            teardown(self.engine.native(), self.book.as_ptr())
        };
        // The lease takes the gate itself when it drops.
        let lease = locked(&self.lease).take();
        drop(lease);
        Some(outcome)
    }

    /// Marks `addr` as busy with an edit.
    pub fn claim_edit(&self, addr: usize, kind: &'static str) -> Result<()> {
        if locked(&self.editing).insert(addr) {
            Ok(())
        } else {
            Err(BindingError::EditInProgress(kind))
        }
    }

    pub fn release_edit(&self, addr: usize) {
        locked(&self.editing).remove(&addr);
    }

    /// Addresses with a retirement flag on record.
    #[cfg(all(test, feature = "sim"))]
    pub fn tracked(&self) -> usize {
        locked(&self.flags).cells.len()
    }
}

const FIRST_SWEEP: usize = 64;

#[derive(Default)]
struct FlagTable {
    cells: HashMap<usize, Arc<AtomicBool>>,
    sweep_at: usize,
}

impl FlagTable {
    fn issue(&mut self, addr: usize) -> Arc<AtomicBool> {
        if self.cells.len() >= self.sweep_at.max(FIRST_SWEEP) {
            // A count of one means only the table still holds the flag.
            self.cells.retain(|_, cell| Arc::strong_count(cell) > 1);
            self.sweep_at = self.cells.len() * 2;
        }
        Arc::clone(
            self.cells
                .entry(addr)
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    fn retire(&mut self, addr: usize) {
        if let Some(cell) = self.cells.remove(&addr) {
            cell.store(true, Ordering::SeqCst);
        }
    }
}

impl fmt::Debug for Lifeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifeline")
            .field("book", &self.book)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Proof that the book is open, held for the duration of a native call.
pub(crate) struct LiveBook<'a> {
    life: &'a Arc<Lifeline>,
    _gate: MutexGuard<'a, ()>,
}

impl<'a> LiveBook<'a> {
    pub fn native(&self) -> &'a dyn NativeEngine {
        self.life.engine.native()
    }

    pub fn book(&self) -> *mut QofBook {
        self.life.book.as_ptr()
    }

    /// Wraps a pointer the engine just handed out. Null is an error.
    pub fn wrap<T>(&self, raw: *mut T, kind: &'static str) -> Result<Handle<T>> {
        self.wrap_opt(raw, kind)
            .ok_or(BindingError::InvalidHandle(kind))
    }

    /// Wraps a pointer where null means "absent".
    pub fn wrap_opt<T>(&self, raw: *mut T, kind: &'static str) -> Option<Handle<T>> {
        let ptr = NonNull::new(raw)?;
        Some(Handle {
            ptr,
            retired: locked(&self.life.flags).issue(ptr.as_ptr() as usize),
            life: Arc::clone(self.life),
            kind,
        })
    }

    /// Resolves another view against this book, for operations that touch
    /// two entities at once.
    pub fn check<T>(&self, handle: &Handle<T>) -> Result<*mut T> {
        if !Arc::ptr_eq(&handle.life, self.life) {
            return Err(BindingError::ForeignEntity(format!(
                "{} belongs to a different book",
                handle.kind
            )));
        }
        if handle.retired.load(Ordering::SeqCst) {
            debug!(kind = handle.kind, "rejected access to released entity");
            return Err(BindingError::StaleHandle(handle.kind));
        }
        Ok(handle.ptr.as_ptr())
    }

    /// Invalidates every view of `addr` made so far. Views made later, once
    /// the engine reuses the address, are unaffected.
    pub fn retire(&self, addr: usize) {
        locked(&self.life.flags).retire(addr);
    }
}

/// A non-owning reference to one native entity.
pub(crate) struct Handle<T> {
    ptr: NonNull<T>,
    retired: Arc<AtomicBool>,
    life: Arc<Lifeline>,
    kind: &'static str,
}

// Moving a view to another thread is fine; every use goes through the gate.
unsafe impl<T> Send for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            retired: Arc::clone(&self.retired),
            life: Arc::clone(&self.life),
            kind: self.kind,
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.kind, self.ptr)
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
            && Arc::ptr_eq(&self.retired, &other.retired)
            && Arc::ptr_eq(&self.life, &other.life)
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Handle<T> {
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn life(&self) -> &Arc<Lifeline> {
        &self.life
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn same_book<U>(&self, other: &Handle<U>) -> bool {
        Arc::ptr_eq(&self.life, &other.life)
    }

    /// Runs `f` with the live pointer, or fails with `StaleHandle`.
    pub fn with<R>(&self, f: impl FnOnce(&LiveBook<'_>, *mut T) -> R) -> Result<R> {
        let live = self.life.enter(self.kind)?;
        let raw = live.check(self)?;
        Ok(f(&live, raw))
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&LiveBook<'_>, *mut T) -> Result<R>) -> Result<R> {
        let live = self.life.enter(self.kind)?;
        let raw = live.check(self)?;
        f(&live, raw)
    }
}
