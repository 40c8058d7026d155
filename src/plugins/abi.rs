//! The entry-point ABI between the host and plugin modules.
//!
//! A module exports a fixed set of optional symbols. They are resolved once when
//! the module is opened and stored in [`PluginFunctions`]; nothing else in the
//! host looks symbols up again.
//!
//! String getters return NUL-terminated strings owned by the module.
//! `getSubCommands` / `getFeatures` return a pointer to a module-owned
//! `Vec<SubCommand>` / `Vec<Feature>`. Those are Rust types, so a module must be
//! built against the same `anvil` version it reports from `getCompatibleVersion`.

use super::library::ModuleHandle;
use crate::registry::ExtensionRegistry;
use serde::Serialize;
use std::ffi::{c_char, c_void};
use tracing::debug;

pub const INITIALIZE_PLUGIN: &str = "initializePlugin";
pub const INITIALIZE_LIBRARY: &str = "initializeLibrary";
pub const GET_PLUGIN_NAME: &str = "getPluginName";
pub const GET_PLUGIN_AUTHOR: &str = "getPluginAuthor";
pub const GET_PLUGIN_DESCRIPTION: &str = "getPluginDescription";
pub const GET_COMPATIBLE_VERSION: &str = "getCompatibleVersion";
pub const SET_IMGUI_CONTEXT: &str = "setImGuiContext";
pub const IS_BUILTIN_PLUGIN: &str = "isBuiltinPlugin";
pub const GET_SUB_COMMANDS: &str = "getSubCommands";
pub const GET_FEATURES: &str = "getFeatures";

/// Receives the registry the plugin registers its content into. May panic to
/// signal failure; the panic is caught by the host.
pub type InitializePluginFn = unsafe extern "C-unwind" fn(registry: *mut ExtensionRegistry);
pub type InitializeLibraryFn = unsafe extern "C-unwind" fn();
pub type GetStringFn = unsafe extern "C" fn() -> *const c_char;
pub type SetContextFn = unsafe extern "C" fn(context: *mut c_void);
pub type IsBuiltinFn = unsafe extern "C" fn() -> bool;
pub type GetListFn = unsafe extern "C" fn() -> *const c_void;

/// Typed entry-point table of one module. Each slot is either bound to a
/// function of the fixed signature or absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginFunctions {
    pub initialize_plugin: Option<InitializePluginFn>,
    pub initialize_library: Option<InitializeLibraryFn>,
    pub get_plugin_name: Option<GetStringFn>,
    pub get_plugin_author: Option<GetStringFn>,
    pub get_plugin_description: Option<GetStringFn>,
    pub get_compatible_version: Option<GetStringFn>,
    pub set_imgui_context: Option<SetContextFn>,
    pub is_builtin_plugin: Option<IsBuiltinFn>,
    pub get_sub_commands: Option<GetListFn>,
    pub get_features: Option<GetListFn>,
}

impl PluginFunctions {
    /// Resolve every role from an opened module
    #[must_use]
    pub fn resolve(handle: &dyn ModuleHandle) -> Self {
        // Safety: each symbol is bound to the signature documented for its role.
        unsafe {
            Self {
                initialize_plugin: bind(handle, INITIALIZE_PLUGIN),
                initialize_library: bind(handle, INITIALIZE_LIBRARY),
                get_plugin_name: bind(handle, GET_PLUGIN_NAME),
                get_plugin_author: bind(handle, GET_PLUGIN_AUTHOR),
                get_plugin_description: bind(handle, GET_PLUGIN_DESCRIPTION),
                get_compatible_version: bind(handle, GET_COMPATIBLE_VERSION),
                set_imgui_context: bind(handle, SET_IMGUI_CONTEXT),
                is_builtin_plugin: bind(handle, IS_BUILTIN_PLUGIN),
                get_sub_commands: bind(handle, GET_SUB_COMMANDS),
                get_features: bind(handle, GET_FEATURES),
            }
        }
    }

    /// True if either initialization role is bound
    #[must_use]
    pub fn has_initializer(&self) -> bool {
        self.initialize_plugin.is_some() || self.initialize_library.is_some()
    }
}

/// Turn a raw symbol address into a typed function pointer.
///
/// Safety: `F` must be a function pointer type matching the exported symbol.
unsafe fn bind<F: Copy>(handle: &dyn ModuleHandle, symbol: &str) -> Option<F> {
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<*mut c_void>()
    );

    let address = handle.resolve(symbol);
    debug!("Resolving '{}': {}", symbol, if address.is_some() { "found" } else { "absent" });

    address.map(|address| std::mem::transmute_copy::<*mut c_void, F>(&address))
}

/// Callback of a plugin-contributed command line sub-command
pub type SubCommandCallback = Box<dyn Fn(&[String]) + Send + Sync>;

/// A command line sub-command contributed by a plugin
pub struct SubCommand {
    pub key: String,
    pub description: String,
    pub callback: SubCommandCallback,
}

impl SubCommand {
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        callback: impl Fn(&[String]) + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            callback: Box::new(callback),
        }
    }

    pub fn run(&self, args: &[String]) {
        (self.callback)(args);
    }
}

impl std::fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubCommand")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A feature toggle reported by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub name: String,
    pub enabled: bool,
}

impl Feature {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }
}

/// Opaque UI context handle the host shares with modules that draw their own UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostContext(*mut c_void);

impl HostContext {
    #[must_use]
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    #[must_use]
    pub fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}
