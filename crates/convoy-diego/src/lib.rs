//! convoy-diego: desired-state descriptors for the container scheduler.
//!
//! The scheduler fetches cached dependencies and droplets by the keys and
//! paths written here, so the serialized form is a wire contract: field
//! names, cache-key formats and path conventions must not drift.
//!
//! - **`descriptor`**: serializable descriptor types
//! - **`buildpack`**: builds a descriptor for a buildpack-staged droplet

pub mod buildpack;
pub mod descriptor;

pub use buildpack::{BuildpackDesiredLrpBuilder, DesiredLrpOptions};
pub use descriptor::{
    Action, CachedDependency, DesiredStateDescriptor, DownloadAction, EnvironmentVariable,
};
