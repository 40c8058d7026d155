//! Anvil - a plugin host
//!
//! Loads native plugin modules, runs their initializers against a shared
//! extension registry and exposes the registered content to the rest of the
//! application.
//!
//! # Modules
//!
//! - [`plugins`]: Module loading, the entry-point ABI and the plugin manager
//! - [`registry`]: The extension registry plugins contribute to
//! - [`host`]: Boot, reload and teardown sequencing
//! - [`builtin`]: The statically linked builtin plugin
//! - [`config`]: Configuration management and serialization

pub mod builtin;
pub mod config;
pub mod host;
pub mod plugins;
pub mod registry;
