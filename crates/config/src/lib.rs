//! Configuration for bru.
//!
//! [`Settings`] are the tool-wide knobs (namespace, cache location) merged
//! from files, the environment and the command line. [`GeneratorConfig`] is
//! the small document each generator keeps in the cache root to remember
//! its last answers.

pub mod error;
mod generator;
mod settings;

pub use crate::generator::{GeneratorConfig, PackageManager};
pub use crate::settings::{ENV_PREFIX, NAMESPACE_ENV, Overrides, Settings};
