// Plugin system: native modules loaded at runtime
pub mod abi;
pub mod error;
pub mod library;
pub mod manager;
pub mod plugin;

// Layers, leaf first:
// - library: open / resolve / close through libloading
// - abi: the fixed entry-point table, resolved once per module
// - plugin: lifecycle and safe call wrappers around one module
// - manager: discovery, ordering, validation and bulk lifecycle

pub use abi::{Feature, HostContext, PluginFunctions, SubCommand};
pub use error::{LoadError, PluginError};
pub use library::{ModuleHandle, ModuleLoader, NativeLoader};
pub use manager::{InitReport, PluginManager, LIBRARY_EXTENSION, PLUGIN_EXTENSION};
pub use plugin::{Plugin, PluginOrigin, PluginStatus};
