//! gnc-sys
//!
//! The C-level surface of the accounting engine: `#[repr(C)]` mirrors of its
//! value structs, opaque entity types, backend error codes, and the
//! [`NativeEngine`] trait listing every entry point the safe layer calls.
//!
//! Nothing in this crate checks lifetimes. Every pointer-taking method is
//! `unsafe` and expects a handle the same engine produced and has not yet
//! released.

pub mod backend;
pub mod engine;
pub mod types;

#[cfg(feature = "linked")]
pub mod linked;
#[cfg(feature = "sim")]
pub mod sim;

pub use backend::*;
pub use engine::NativeEngine;
pub use types::*;
