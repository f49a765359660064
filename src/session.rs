//! Sessions: a book attached to a backing store.
//!
//! Opening either yields a fully open [`Session`] or releases everything it
//! acquired on the way. Dropping a session ends it; [`Session::end`] does
//! the same but reports teardown errors.

use std::ffi::CStr;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use gnc_domain::SessionOpenMode;
use gnc_sys::{NativeEngine, QofSession};
use tracing::{info, warn};

use crate::book::Book;
use crate::engine::Engine;
use crate::error::{BackendErrorKind, BindingError, Result};
use crate::lifeline::Lifeline;
use crate::marshal::{copy_str, to_cstring, truth};

pub struct Session {
    life: Arc<Lifeline>,
    session: NonNull<QofSession>,
    uri: String,
    mode: SessionOpenMode,
    save_on_end: bool,
}

// The session pointer is only used under the engine gate.
unsafe impl Send for Session {}

/// Ends and destroys a half-open session unless disarmed.
struct PendingSession<'a> {
    native: &'a dyn NativeEngine,
    session: NonNull<QofSession>,
    armed: bool,
}

impl PendingSession<'_> {
    fn disarm(mut self) -> NonNull<QofSession> {
        self.armed = false;
        self.session
    }
}

impl Drop for PendingSession<'_> {
    fn drop(&mut self) {
        if self.armed {
            unsafe {
                self.native.session_end(self.session.as_ptr());
                self.native.session_destroy(self.session.as_ptr());
            }
        }
    }
}

/// Reads and clears the session's pending error.
///
/// # Safety
/// `session` must be a live session of `native`.
unsafe fn check(
    native: &dyn NativeEngine,
    session: *mut QofSession,
    operation: &'static str,
) -> Result<()> {
    let message = copy_str(native.session_get_error_message(session));
    let code = native.session_pop_error(session);
    match BackendErrorKind::from_code(code) {
        None => Ok(()),
        Some(kind) => Err(BindingError::NativeCallFailed {
            operation,
            kind,
            message: if message.is_empty() {
                kind.to_string()
            } else {
                message
            },
        }),
    }
}

/// Runs the native open sequence. Must be called with the gate held.
fn open_native(
    native: &dyn NativeEngine,
    uri: &CStr,
    mode: SessionOpenMode,
) -> Result<(NonNull<QofSession>, NonNull<gnc_sys::QofBook>)> {
    unsafe {
        let session = NonNull::new(native.session_new(ptr::null_mut()))
            .ok_or(BindingError::InvalidHandle("session"))?;
        let pending = PendingSession {
            native,
            session,
            armed: true,
        };
        native.session_begin(session.as_ptr(), uri.as_ptr(), mode.code());
        check(native, session.as_ptr(), "session begin")?;
        if !mode.creates_store() {
            native.session_load(session.as_ptr());
            check(native, session.as_ptr(), "session load")?;
        }
        let book = NonNull::new(native.session_get_book(session.as_ptr()))
            .ok_or(BindingError::InvalidHandle("book"))?;
        Ok((pending.disarm(), book))
    }
}

impl Session {
    pub fn open(engine: &Engine, uri: &str, mode: SessionOpenMode) -> Result<Session> {
        let c_uri = to_cstring(uri, "session uri")?;
        let lease = engine.lease();
        let opened = {
            let _gate = engine.gate();
            open_native(engine.native(), &c_uri, mode)
        };
        let (session, book) = match opened {
            Ok(parts) => parts,
            Err(err) => {
                warn!(uri, %mode, error = %err, "session open failed");
                return Err(err);
            }
        };
        info!(uri, %mode, engine = engine.native_label(), "session opened");
        Ok(Session {
            life: Lifeline::new(engine.clone(), book, lease),
            session,
            uri: uri.to_string(),
            mode,
            save_on_end: engine.config().save_on_end,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mode(&self) -> SessionOpenMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.life.is_alive()
    }

    /// Save dirty books automatically when the session ends.
    pub fn set_save_on_end(&mut self, enabled: bool) {
        self.save_on_end = enabled;
    }

    /// The session's book. Valid until the session ends.
    pub fn book(&self) -> Book {
        Book::borrowed(Arc::clone(&self.life))
    }

    pub fn is_read_only(&self) -> Result<bool> {
        let live = self.life.enter("session")?;
        Ok(truth(unsafe { live.native().book_is_readonly(live.book()) }))
    }

    pub fn save(&self) -> Result<()> {
        {
            let live = self.life.enter("session")?;
            unsafe {
                live.native().session_save(self.session.as_ptr());
                check(live.native(), self.session.as_ptr(), "session save")?;
            }
        }
        info!(uri = %self.uri, "session saved");
        Ok(())
    }

    /// Ends the session, saving first if configured to, and reports any
    /// error. All views of the book become stale.
    pub fn end(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let saved = if self.save_on_end && self.is_dirty() {
            self.save()
        } else {
            Ok(())
        };
        let session = self.session;
        let ended = self.life.release(|native, _book| unsafe {
            native.session_end(session.as_ptr());
            let ended = check(native, session.as_ptr(), "session end");
            native.session_destroy(session.as_ptr());
            ended
        });
        match ended {
            None => Ok(()),
            Some(ended) => {
                info!(uri = %self.uri, "session closed");
                saved.and(ended)
            }
        }
    }

    fn is_dirty(&self) -> bool {
        self.book().is_dirty().unwrap_or(false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("uri", &self.uri)
            .field("mode", &self.mode)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            warn!(uri = %self.uri, error = %err, "error while closing session");
        }
    }
}
