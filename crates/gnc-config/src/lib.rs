//! gnc-config
//!
//! Persistent settings for the binding layer: where named stores live, how
//! sessions open by default and which log filter to install.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::BindingConfig;
