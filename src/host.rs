//! The host: owns the plugins, the extension registry and the pattern runtime,
//! and sequences boot and teardown.
//!
//! Boot runs every plugin initializer, then the queued startup tasks, then
//! installs the registered language functions into the runtime. The registry is
//! only mutable before boot completes; afterwards it can be shared read-only
//! with other threads through [`Host::share_registry`].

use crate::plugins::{
    HostContext, InitReport, ModuleLoader, NativeLoader, PluginFunctions, PluginManager, PluginStatus,
};
use crate::registry::pattern_language::Literal;
use crate::registry::{ExtensionRegistry, RuntimeError, SharedRuntime};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Version plugins must report from `getCompatibleVersion`
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum HostError {
    #[error("the host has not finished booting")]
    NotBooted,

    #[error("the host has already booted")]
    AlreadyBooted,

    #[error("the extension registry is still shared with other readers")]
    RegistryShared,

    #[error("no plugin provides the sub-command '{0}'")]
    UnknownSubCommand(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// What happened during boot
#[derive(Debug, Default)]
pub struct BootReport {
    pub plugins: InitReport,
    pub startup_tasks: usize,
    pub language_functions: usize,
}

pub struct Host {
    // Fields drop in declaration order. Registry entries and the runtime may
    // hold callbacks that live in plugin modules, so they go before `plugins`.
    registry: Arc<ExtensionRegistry>,
    runtime: SharedRuntime,
    plugins: PluginManager,
    version: String,
    booted: bool,
}

impl Host {
    /// Create a host that loads plugins with the native module loader
    ///
    /// # Errors
    /// Fails if the pattern runtime cannot be created
    pub fn new() -> Result<Self, HostError> {
        Self::with_loader(Box::new(NativeLoader))
    }

    /// # Errors
    /// Fails if the pattern runtime cannot be created
    pub fn with_loader(loader: Box<dyn ModuleLoader>) -> Result<Self, HostError> {
        Ok(Self {
            registry: Arc::new(ExtensionRegistry::new()),
            runtime: SharedRuntime::new()?,
            plugins: PluginManager::with_loader(loader),
            version: HOST_VERSION.to_string(),
            booted: false,
        })
    }

    /// Report `version` to plugin module files instead of [`HOST_VERSION`]
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Register a statically linked plugin. Builtins survive plugin reloads.
    /// Returns false if `functions` has no initializer.
    pub fn add_builtin(&mut self, functions: PluginFunctions) -> bool {
        self.plugins.add_plugin(functions)
    }

    /// Load the plugins in `folder`. Only possible before boot.
    pub fn load_plugin_dir<P: AsRef<Path>>(&mut self, folder: P) -> bool {
        if self.booted {
            warn!(
                "Not loading plugins from '{}' after boot; reload instead",
                folder.as_ref().display()
            );
            return false;
        }

        self.plugins.load(folder)
    }

    /// Initialize every plugin, run the startup tasks and configure the pattern runtime.
    ///
    /// Individual plugin failures are reported, not returned.
    ///
    /// # Errors
    /// - [`HostError::AlreadyBooted`] on a second call
    /// - [`HostError::RegistryShared`] if a registry handle is still alive
    /// - [`HostError::Runtime`] if the runtime cannot be configured
    pub fn boot(&mut self) -> Result<BootReport, HostError> {
        if self.booted {
            return Err(HostError::AlreadyBooted);
        }

        let registry = Arc::get_mut(&mut self.registry).ok_or(HostError::RegistryShared)?;

        let plugins = self.plugins.initialize_all(&self.version, registry);
        for failure in &plugins.failed {
            warn!("Plugin '{}' is not active: {}", failure.plugin(), failure);
        }

        let startup_tasks = registry.run_startup_tasks();

        let language_functions = self.runtime.lock()?.configure(&registry.pattern_language)?;

        self.booted = true;
        info!(
            "Boot finished: {} plugin(s) active, {} failed, {} startup task(s)",
            plugins.initialized.len(),
            plugins.failed.len(),
            startup_tasks
        );

        Ok(BootReport {
            plugins,
            startup_tasks,
            language_functions,
        })
    }

    #[must_use]
    pub fn is_booted(&self) -> bool {
        self.booted
    }

    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Mutable registry access, available before boot and while unshared
    pub fn registry_mut(&mut self) -> Option<&mut ExtensionRegistry> {
        if self.booted {
            return None;
        }
        Arc::get_mut(&mut self.registry)
    }

    /// A read-only handle for other threads. Reload waits for every handle to be dropped.
    ///
    /// # Errors
    /// [`HostError::NotBooted`] before boot completes
    pub fn share_registry(&self) -> Result<Arc<ExtensionRegistry>, HostError> {
        if !self.booted {
            return Err(HostError::NotBooted);
        }
        Ok(Arc::clone(&self.registry))
    }

    #[must_use]
    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// # Errors
    /// [`HostError::Runtime`] if the runtime lock is poisoned
    pub fn set_allow_dangerous(&self, allow: bool) -> Result<(), HostError> {
        self.runtime.lock()?.set_allow_dangerous(allow);
        Ok(())
    }

    /// Run a pattern script
    ///
    /// # Errors
    /// [`HostError::NotBooted`] before boot, otherwise any runtime error
    pub fn evaluate(&self, source: &str) -> Result<Option<Literal>, HostError> {
        if !self.booted {
            return Err(HostError::NotBooted);
        }
        Ok(self.runtime.execute(source)?)
    }

    #[must_use]
    pub fn plugin_statuses(&self) -> Vec<PluginStatus> {
        self.plugins.plugins().iter().map(|plugin| plugin.status()).collect()
    }

    /// Run the sub-command `key` of the first active plugin providing it
    ///
    /// # Errors
    /// [`HostError::NotBooted`] or [`HostError::UnknownSubCommand`]
    pub fn run_sub_command(&self, key: &str, args: &[String]) -> Result<(), HostError> {
        if !self.booted {
            return Err(HostError::NotBooted);
        }

        let command = self
            .plugins
            .find_sub_command(key)
            .ok_or_else(|| HostError::UnknownSubCommand(key.to_string()))?;

        info!("Running sub-command '{}'", key);
        command.run(args);
        Ok(())
    }

    pub fn set_host_context(&self, context: HostContext) {
        self.plugins.set_host_context(context);
    }

    /// Load persisted settings values into the settings registry
    ///
    /// # Errors
    /// [`HostError::RegistryShared`] if a registry handle is still alive
    pub fn load_settings(&mut self, data: Value) -> Result<(), HostError> {
        let registry = Arc::get_mut(&mut self.registry).ok_or(HostError::RegistryShared)?;
        registry.settings.load_all(data);
        Ok(())
    }

    #[must_use]
    pub fn store_settings(&self) -> Value {
        self.registry.settings.store_all()
    }

    /// Start the registered background services
    ///
    /// # Errors
    /// [`HostError::NotBooted`] before boot, [`HostError::RegistryShared`] if shared
    pub fn start_services(&mut self, interval: Duration) -> Result<usize, HostError> {
        if !self.booted {
            return Err(HostError::NotBooted);
        }

        let registry = Arc::get_mut(&mut self.registry).ok_or(HostError::RegistryShared)?;
        Ok(registry.background_services.start_all(interval))
    }

    /// Tear down all registered content, reload every plugin from the same
    /// folders and boot again. Builtins are registered again first and
    /// settings values are kept.
    ///
    /// # Errors
    /// [`HostError::RegistryShared`] if a registry handle is still alive, or any boot error
    pub fn reload_plugins(&mut self) -> Result<BootReport, HostError> {
        let registry = Arc::get_mut(&mut self.registry).ok_or(HostError::RegistryShared)?;

        // Content may point into the modules, so it goes first
        registry.clear();
        self.runtime.lock()?.reset()?;

        self.plugins.reload();

        self.booted = false;
        self.boot()
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        if let Ok(mut runtime) = self.runtime.lock() {
            if let Err(err) = runtime.reset() {
                error!("Failed to reset pattern runtime: {}", err);
            }
        }

        match Arc::get_mut(&mut self.registry) {
            Some(registry) => registry.clear(),
            None => {
                // Registry handles outlive the host; keep the modules mapped
                // so their callbacks stay valid.
                error!("Extension registry still shared at shutdown, leaking plugin modules");
                std::mem::forget(std::mem::take(&mut self.plugins));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::abi::{GetStringFn, InitializePluginFn};
    use crate::registry::pattern_language::ParameterCount;
    use serde_json::json;
    use std::ffi::c_char;

    extern "C-unwind" fn init(registry: *mut ExtensionRegistry) {
        let registry = unsafe { &mut *registry };
        registry.pattern_language.add_function("host_test", "answer", ParameterCount::None, |_| {
            Ok(Some(Literal::Integer(42)))
        });
        registry
            .settings
            .add("host_test", "", "flag", crate::registry::settings::Checkbox::new(false));
        registry.on_startup_finished(|registry| {
            registry.experiments.add_experiment("host_test.late", "late", "");
        });
    }

    extern "C" fn name() -> *const c_char {
        b"Host Test\0".as_ptr().cast()
    }

    extern "C-unwind" fn clashing_init(registry: *mut ExtensionRegistry) {
        let registry = unsafe { &mut *registry };
        let language = &mut registry.pattern_language;
        language.add_function("good", "answer", ParameterCount::None, |_| Ok(Some(Literal::Integer(7))));
        language.add_function("good", "answer", ParameterCount::None, |_| Ok(None));
        language.add_function("good::answer", "inner", ParameterCount::None, |_| Ok(None));
        language.add_function("print", "shadow", ParameterCount::None, |_| Ok(None));
    }

    fn host() -> Host {
        let mut host = Host::new().unwrap();
        host.add_builtin(PluginFunctions {
            initialize_plugin: Some(init as InitializePluginFn),
            get_plugin_name: Some(name as GetStringFn),
            ..Default::default()
        });
        host
    }

    #[test]
    fn test_boot_runs_plugins_tasks_and_runtime() {
        let mut host = host();
        let report = host.boot().unwrap();

        assert_eq!(report.plugins.initialized, vec!["Host Test".to_string()]);
        assert_eq!(report.startup_tasks, 1);
        assert_eq!(report.language_functions, 1);
        assert!(host.registry().experiments.get("host_test.late").is_some());
        assert_eq!(host.evaluate("return host_test.answer()").unwrap(), Some(Literal::Integer(42)));
        assert!(matches!(host.boot(), Err(HostError::AlreadyBooted)));
    }

    #[test]
    fn test_boot_barrier() {
        let mut host = host();
        assert!(matches!(host.share_registry(), Err(HostError::NotBooted)));
        assert!(matches!(host.evaluate("return 1"), Err(HostError::NotBooted)));
        assert!(host.registry_mut().is_some());

        host.boot().unwrap();
        assert!(host.registry_mut().is_none());

        let shared = host.share_registry().unwrap();
        assert!(matches!(host.reload_plugins(), Err(HostError::RegistryShared)));

        drop(shared);
        assert!(host.reload_plugins().is_ok());
    }

    #[test]
    fn test_reload_restores_builtin_content() {
        let mut host = host();
        host.boot().unwrap();

        let report = host.reload_plugins().unwrap();
        assert_eq!(report.plugins.initialized.len(), 1);
        assert_eq!(host.registry().pattern_language.functions().len(), 1);
        assert_eq!(host.registry().settings.categories().len(), 1);
        assert_eq!(host.evaluate("return host_test.answer()").unwrap(), Some(Literal::Integer(42)));
    }

    #[test]
    fn test_name_clashes_do_not_stop_boot() {
        let mut host = host();
        host.add_builtin(PluginFunctions {
            initialize_plugin: Some(clashing_init as InitializePluginFn),
            ..Default::default()
        });

        let report = host.boot().unwrap();
        assert_eq!(report.plugins.initialized.len(), 2);
        assert_eq!(host.registry().pattern_language.functions().len(), 4);
        assert_eq!(report.language_functions, 2);
        assert_eq!(host.evaluate("return good.answer()").unwrap(), Some(Literal::Integer(7)));
        assert_eq!(host.evaluate("return host_test.answer()").unwrap(), Some(Literal::Integer(42)));
    }

    #[test]
    fn test_settings_survive_reload() {
        let mut host = host();
        host.load_settings(json!({ "host_test": { "flag": true }, "other": { "kept": 3 } }))
            .unwrap();
        host.boot().unwrap();
        assert_eq!(host.store_settings()["host_test"]["flag"], json!(true));

        host.reload_plugins().unwrap();
        let stored = host.store_settings();
        assert_eq!(stored["host_test"]["flag"], json!(true));
        assert_eq!(stored["other"]["kept"], json!(3));
        assert_eq!(
            host.registry().settings.entry("host_test", "flag").map(|entry| entry.widget().store()),
            Some(json!(true))
        );
    }

    #[test]
    fn test_add_builtin_rejects_empty_table() {
        let mut host = Host::new().unwrap();
        assert!(!host.add_builtin(PluginFunctions::default()));
        assert!(host.plugins().plugins().is_empty());
    }

    #[test]
    fn test_settings_round_trip_through_host() {
        let mut host = host();
        host.boot().unwrap();

        host.load_settings(json!({ "host_test": { "flag": true } })).unwrap();
        assert_eq!(host.store_settings()["host_test"]["flag"], json!(true));
    }

    #[test]
    fn test_unknown_sub_command() {
        let mut host = host();
        host.boot().unwrap();

        assert!(matches!(
            host.run_sub_command("missing", &[]),
            Err(HostError::UnknownSubCommand(key)) if key == "missing"
        ));
    }

    #[test]
    fn test_version_override_applies() {
        let mut host = host();
        host.set_version("9.9.9");
        assert_eq!(host.version(), "9.9.9");
        assert!(host.boot().unwrap().plugins.is_clean());
    }
}
