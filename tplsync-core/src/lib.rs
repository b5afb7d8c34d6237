//! tplsync core library — domain types, configuration, errors.
//!
//! - [`types`] — remote source, destination and their newtypes
//! - [`config`] — optional YAML config file and CLI overlay
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{Destination, RemoteSource, RepositoryAddress, TemplateSubpath};
