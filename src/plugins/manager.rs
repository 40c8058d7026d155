use super::abi::{HostContext, PluginFunctions, SubCommand};
use super::error::PluginError;
use super::library::{ModuleLoader, NativeLoader};
use super::plugin::{Plugin, PluginOrigin};
use crate::host::HOST_VERSION;
use crate::registry::ExtensionRegistry;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// File extension of library plugins (shared code, no features of their own)
pub const LIBRARY_EXTENSION: &str = "anvilpluglib";

/// File extension of application plugins
pub const PLUGIN_EXTENSION: &str = "anvilplug";

/// Outcome of initializing every pending plugin
#[derive(Debug, Default)]
pub struct InitReport {
    /// Names of plugins that initialized successfully
    pub initialized: Vec<String>,
    /// Plugins that refused or failed to initialize
    pub failed: Vec<PluginError>,
}

impl InitReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Discovers, orders, validates and owns plugins
pub struct PluginManager {
    plugins: Vec<Plugin>,
    plugin_paths: Vec<PathBuf>,
    loader: Box<dyn ModuleLoader>,
}

impl PluginManager {
    /// Create a plugin manager that opens modules with the native loader
    #[must_use]
    pub fn new() -> Self {
        Self::with_loader(Box::new(NativeLoader))
    }

    #[must_use]
    pub fn with_loader(loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            plugins: Vec::new(),
            plugin_paths: Vec::new(),
            loader,
        }
    }

    /// Load every plugin found in `folder`.
    ///
    /// Library plugins are opened before application plugins so the OS loader
    /// can resolve dependencies on them. Within each kind files are taken in
    /// file name order. Invalid plugins are discarded.
    ///
    /// Returns false if the folder does not exist or contributed no valid plugin.
    pub fn load<P: AsRef<Path>>(&mut self, folder: P) -> bool {
        let folder = folder.as_ref();

        if !folder.is_dir() {
            warn!("Plugin folder '{}' does not exist", folder.display());
            return false;
        }

        let candidates = match candidate_files(folder) {
            Ok(candidates) => candidates,
            Err(err) => {
                error!("Failed to read plugin folder '{}': {}", folder.display(), err);
                return false;
            }
        };

        self.plugin_paths.push(folder.to_path_buf());
        let before = self.plugins.len();

        for extension in [LIBRARY_EXTENSION, PLUGIN_EXTENSION] {
            for path in candidates.iter().filter(|path| has_extension(path, extension)) {
                let plugin = Plugin::open(self.loader.as_ref(), path);
                if plugin.is_valid() {
                    self.plugins.push(plugin);
                } else {
                    debug!("Discarding invalid plugin '{}'", plugin.origin());
                }
            }
        }

        let loaded = self.plugins.len() - before;
        info!("Loaded {} plugin(s) from '{}'", loaded, folder.display());

        loaded > 0
    }

    /// Drop every plugin, closing its module, and forget all search paths.
    ///
    /// Registry content contributed by the plugins is left alone; callers must
    /// tear it down before unloading, since it may point into the modules.
    pub fn unload(&mut self) {
        self.plugins.clear();
        self.plugin_paths.clear();
    }

    /// Unload everything, then load again from the same folders in the same order.
    ///
    /// Statically linked plugins are added back first, uninitialized.
    pub fn reload(&mut self) {
        let paths = self.plugin_paths.clone();
        let statics: Vec<PluginFunctions> = self
            .plugins
            .iter()
            .filter(|plugin| matches!(plugin.origin(), PluginOrigin::Static))
            .map(|plugin| *plugin.functions())
            .collect();

        self.unload();

        for functions in statics {
            self.add_plugin(functions);
        }
        for path in &paths {
            self.load(path);
        }
    }

    /// Add a statically linked plugin. Returns false, adding nothing, if
    /// `functions` has no initializer.
    pub fn add_plugin(&mut self, functions: PluginFunctions) -> bool {
        let plugin = Plugin::from_functions(functions);
        if !plugin.is_valid() {
            warn!("Ignoring statically linked plugin without an initializer");
            return false;
        }

        self.plugins.push(plugin);
        true
    }

    /// Initialize every plugin that is not initialized yet, in collection order.
    /// A failing plugin never stops the ones after it.
    ///
    /// Module files are checked against `host_version`. Statically linked
    /// plugins are built with this crate and always checked against [`HOST_VERSION`].
    pub fn initialize_all(
        &mut self,
        host_version: &str,
        registry: &mut ExtensionRegistry,
    ) -> InitReport {
        let mut report = InitReport::default();

        for plugin in self.plugins.iter_mut().filter(|plugin| !plugin.is_initialized()) {
            let version = match plugin.origin() {
                PluginOrigin::Static => HOST_VERSION,
                PluginOrigin::File(_) => host_version,
            };

            match plugin.initialize(version, registry) {
                Ok(()) => report.initialized.push(plugin.name()),
                Err(err) => report.failed.push(err),
            }
        }

        report
    }

    /// Forward the host UI context to every plugin
    pub fn set_host_context(&self, context: HostContext) {
        for plugin in &self.plugins {
            plugin.set_host_context(context);
        }
    }

    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut [Plugin] {
        &mut self.plugins
    }

    #[must_use]
    pub fn plugin_paths(&self) -> &[PathBuf] {
        &self.plugin_paths
    }

    /// Plugins that initialized successfully
    pub fn active_plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter().filter(|plugin| plugin.is_initialized())
    }

    /// Sub-commands of all active plugins, in plugin order
    pub fn sub_commands(&self) -> impl Iterator<Item = (&Plugin, &SubCommand)> {
        self.active_plugins()
            .flat_map(|plugin| plugin.sub_commands().iter().map(move |command| (plugin, command)))
    }

    /// First active sub-command registered under `key`
    #[must_use]
    pub fn find_sub_command(&self, key: &str) -> Option<&SubCommand> {
        self.sub_commands()
            .map(|(_, command)| command)
            .find(|command| command.key == key)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

fn candidate_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension() == Some(OsStr::new(extension))
}
