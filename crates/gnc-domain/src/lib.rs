//! gnc-domain
//!
//! Plain value types shared by the binding layer: identifiers, exact rationals,
//! timestamps and the enumerations the engine speaks in.
//! No native calls, no I/O.

pub mod account;
pub mod error;
pub mod guid;
pub mod numeric;
pub mod price;
pub mod session;
pub mod time;

pub use account::*;
pub use error::ValueError;
pub use guid::Guid;
pub use numeric::{IntoNumeric, Numeric};
pub use price::*;
pub use session::*;
pub use time::Time64;
