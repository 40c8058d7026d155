use super::abi::{Feature, GetStringFn, HostContext, PluginFunctions, SubCommand};
use super::error::PluginError;
use super::library::{ModuleHandle, ModuleLoader};
use crate::registry::ExtensionRegistry;
use serde::Serialize;
use std::ffi::{c_void, CStr};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Where a plugin came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOrigin {
    /// Opened from a module file
    File(PathBuf),
    /// Linked into the host and registered through its entry-point table
    Static,
}

impl fmt::Display for PluginOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Static => write!(f, "statically linked"),
        }
    }
}

/// Snapshot of a plugin for status displays
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub name: String,
    pub author: String,
    pub description: String,
    pub loaded: bool,
    pub builtin: bool,
    pub library: bool,
    pub features: Vec<Feature>,
}

/// A loaded module together with its resolved entry points
pub struct Plugin {
    functions: PluginFunctions,
    origin: PluginOrigin,
    initialized: bool,
    // Declared last: the module must outlive every pointer in `functions`.
    handle: Option<Box<dyn ModuleHandle>>,
}

impl Plugin {
    /// Open the module at `path` and resolve its entry points.
    ///
    /// A module that fails to open yields a plugin without a handle or entry
    /// points, which reports itself as invalid.
    pub fn open(loader: &dyn ModuleLoader, path: &Path) -> Self {
        info!("Loading plugin '{}'", file_name(path));

        let (handle, functions) = match loader.open(path) {
            Ok(handle) => {
                let functions = PluginFunctions::resolve(handle.as_ref());
                (Some(handle), functions)
            }
            Err(err) => {
                error!(
                    "Loading plugin '{}' failed: {} (os error: {:?})",
                    file_name(path),
                    err.reason,
                    err.os_code
                );
                (None, PluginFunctions::default())
            }
        };

        Self {
            functions,
            origin: PluginOrigin::File(path.to_path_buf()),
            initialized: false,
            handle,
        }
    }

    /// Wrap the entry-point table of a statically linked plugin
    #[must_use]
    pub fn from_functions(functions: PluginFunctions) -> Self {
        Self {
            functions,
            origin: PluginOrigin::Static,
            initialized: false,
            handle: None,
        }
    }

    /// Run the plugin's initialization entry point against `registry`.
    ///
    /// Library plugins need no explicit call and succeed immediately. Other
    /// plugins must report either `host_version` or an empty string from
    /// `getCompatibleVersion`.
    ///
    /// # Errors
    /// - [`PluginError::VersionMismatch`] if the plugin was built for another host
    /// - [`PluginError::MissingEntryPoint`] if `initializePlugin` is not exported
    /// - [`PluginError::Initialization`] if the entry point panicked
    pub fn initialize(
        &mut self,
        host_version: &str,
        registry: &mut ExtensionRegistry,
    ) -> Result<(), PluginError> {
        let plugin_name = self.name();

        if self.is_library_plugin() {
            self.initialized = true;
            return Ok(());
        }

        let requested = self.compatible_version();
        if requested != host_version {
            if requested.is_empty() {
                warn!(
                    "Plugin '{}' did not specify a compatible version, assuming it is compatible with host version {}",
                    plugin_name, host_version
                );
            } else {
                error!(
                    "Refused to load plugin '{}' which was built for a different host version: '{}'",
                    plugin_name, requested
                );
                return Err(PluginError::VersionMismatch {
                    plugin: plugin_name,
                    requested,
                    host: host_version.to_string(),
                });
            }
        }

        let Some(initialize) = self.functions.initialize_plugin else {
            error!("Plugin '{}' does not have a proper entry point", plugin_name);
            return Err(PluginError::MissingEntryPoint {
                plugin: plugin_name,
            });
        };

        let registry: *mut ExtensionRegistry = registry;
        // Safety: the registry pointer is valid and exclusively borrowed for the call.
        let outcome = catch_unwind(AssertUnwindSafe(|| unsafe { initialize(registry) }));

        if let Err(payload) = outcome {
            let reason = panic_message(payload.as_ref());
            error!("Plugin '{}' failed on init: {}", plugin_name, reason);
            return Err(PluginError::Initialization {
                plugin: plugin_name,
                reason,
            });
        }

        info!("Plugin '{}' initialized successfully", plugin_name);
        self.initialized = true;
        Ok(())
    }

    /// Display name, or a fallback naming the plugin's origin
    #[must_use]
    pub fn name(&self) -> String {
        read_string(self.functions.get_plugin_name).unwrap_or_else(|| {
            if self.is_library_plugin() {
                "Library Plugin".to_string()
            } else {
                format!("Unknown Plugin @ {}", self.origin)
            }
        })
    }

    #[must_use]
    pub fn author(&self) -> String {
        read_string(self.functions.get_plugin_author).unwrap_or_else(|| "Unknown".to_string())
    }

    #[must_use]
    pub fn description(&self) -> String {
        read_string(self.functions.get_plugin_description).unwrap_or_default()
    }

    /// Host version the plugin was built for; empty if unspecified
    #[must_use]
    pub fn compatible_version(&self) -> String {
        read_string(self.functions.get_compatible_version).unwrap_or_default()
    }

    /// Share the host's UI context with the module, if it wants one
    pub fn set_host_context(&self, context: HostContext) {
        if let Some(set_context) = self.functions.set_imgui_context {
            // Safety: signature fixed by the ABI; the pointer is opaque to the host.
            unsafe { set_context(context.as_ptr()) };
        }
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        match self.functions.is_builtin_plugin {
            // Safety: signature fixed by the ABI
            Some(is_builtin) => unsafe { is_builtin() },
            None => false,
        }
    }

    /// Sub-commands the module contributes. The list is owned by the module.
    #[must_use]
    pub fn sub_commands(&self) -> &[SubCommand] {
        // Safety: the module returns a pointer to a Vec<SubCommand> it keeps alive
        // while loaded, and it stays loaded for as long as `self` is borrowed.
        unsafe { read_list(self.functions.get_sub_commands) }
    }

    /// Feature toggles the module reports
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        // Safety: as for `sub_commands`, with a Vec<Feature>
        unsafe { read_list(self.functions.get_features) }
    }

    /// True iff at least one initialization role is bound. A module without an
    /// initializer has nothing the host can run.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.functions.has_initializer()
    }

    /// True once initialization succeeded
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_library_plugin(&self) -> bool {
        self.functions.initialize_library.is_some() && self.functions.initialize_plugin.is_none()
    }

    /// True if the plugin owns an opened module
    #[must_use]
    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn origin(&self) -> &PluginOrigin {
        &self.origin
    }

    /// Path of the module file, `None` for statically linked plugins
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            PluginOrigin::File(path) => Some(path),
            PluginOrigin::Static => None,
        }
    }

    #[must_use]
    pub fn functions(&self) -> &PluginFunctions {
        &self.functions
    }

    #[must_use]
    pub fn status(&self) -> PluginStatus {
        PluginStatus {
            name: self.name(),
            author: self.author(),
            description: self.description(),
            loaded: self.initialized,
            builtin: self.is_builtin(),
            library: self.is_library_plugin(),
            features: self.features().to_vec(),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("origin", &self.origin)
            .field("initialized", &self.initialized)
            .field("has_handle", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn read_string(getter: Option<GetStringFn>) -> Option<String> {
    let getter = getter?;

    // Safety: the ABI requires a NUL-terminated string (or null) owned by the module
    unsafe {
        let ptr = getter();
        if ptr.is_null() {
            return None;
        }
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Safety: `getter` must return null or a pointer to a live `Vec<T>`.
unsafe fn read_list<'a, T>(getter: Option<unsafe extern "C" fn() -> *const c_void>) -> &'a [T] {
    match getter {
        Some(getter) => getter()
            .cast::<Vec<T>>()
            .as_ref()
            .map(Vec::as_slice)
            .unwrap_or_default(),
        None => &[],
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
