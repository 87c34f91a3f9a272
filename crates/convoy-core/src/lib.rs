//! convoy-core: shared configuration and lifecycle types for Convoy.
//!
//! - **`config`**: `convoy.toml` parser (scheduler settings, lifecycle bundles)
//! - **`bundle`**: resolves a `(lifecycle, stack)` pair to a bundle URI
//! - **`lifecycle`**: buildpack lifecycle data attached to apps, builds and droplets

pub mod bundle;
pub mod config;
pub mod lifecycle;

pub use bundle::LifecycleBundleUri;
pub use config::{ConfigError, ConvoyConfig, DiegoConfig};
pub use lifecycle::{BuildpackLifecycleData, LifecycleSummary, ValidationError};
