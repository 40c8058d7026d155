//! Extension registry: typed collections that plugins fill during initialization
//! and host subsystems read afterwards.
//!
//! The host owns one [`ExtensionRegistry`] and hands it to every plugin's
//! `initializePlugin` entry point. Nothing here is global.

pub mod command_palette;
pub mod container;
pub mod data_formatter;
pub mod data_inspector;
pub mod data_visualizer;
pub mod experiments;
pub mod file_handler;
pub mod hashes;
pub mod interface;
pub mod pattern_language;
pub mod provider;
pub mod services;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub use command_palette::CommandPalette;
pub use container::{FlatRegistry, Keyed, PriorityRegistry};
pub use data_formatter::DataFormatters;
pub use data_inspector::DataInspector;
pub use data_visualizer::DataVisualizers;
pub use experiments::Experiments;
pub use file_handler::FileHandlers;
pub use hashes::Hashes;
pub use interface::Interface;
pub use pattern_language::{PatternLanguage, PatternRuntime, RuntimeError, SharedRuntime};
pub use provider::Providers;
pub use services::{BackgroundServices, NetworkEndpoints};
pub use settings::Settings;

/// Stable, namespaced identifier such as `hex.builtin.setting.interface`.
/// Used both as registry key and as localization key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlocalizedString(String);

impl UnlocalizedString {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for UnlocalizedString {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for UnlocalizedString {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for UnlocalizedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UnlocalizedString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for UnlocalizedString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for UnlocalizedString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for UnlocalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type StartupTask = Box<dyn FnOnce(&mut ExtensionRegistry) + Send + Sync>;

/// Every registry plugins can contribute to
#[derive(Default)]
pub struct ExtensionRegistry {
    pub settings: Settings,
    pub pattern_language: PatternLanguage,
    pub interface: Interface,
    pub data_visualizers: DataVisualizers,
    pub hashes: Hashes,
    pub providers: Providers,
    pub command_palette: CommandPalette,
    pub data_inspector: DataInspector,
    pub data_formatters: DataFormatters,
    pub file_handlers: FileHandlers,
    pub experiments: Experiments,
    pub network_endpoints: NetworkEndpoints,
    pub background_services: BackgroundServices,
    startup_tasks: Vec<StartupTask>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run once, after every plugin has been initialized.
    /// Tasks still receive mutable access to the registry.
    pub fn on_startup_finished(
        &mut self,
        task: impl FnOnce(&mut ExtensionRegistry) + Send + Sync + 'static,
    ) {
        self.startup_tasks.push(Box::new(task));
    }

    /// Run and drain every queued startup task in registration order.
    /// Tasks queued by a running task run in the same call.
    pub fn run_startup_tasks(&mut self) -> usize {
        let mut count = 0;

        loop {
            let tasks = std::mem::take(&mut self.startup_tasks);
            if tasks.is_empty() {
                break;
            }

            for task in tasks {
                task(self);
                count += 1;
            }
        }

        count
    }

    #[must_use]
    pub fn pending_startup_tasks(&self) -> usize {
        self.startup_tasks.len()
    }

    /// Drop every registered entry.
    ///
    /// Entries may hold callbacks living in plugin modules, so this must run
    /// before those modules are unloaded.
    pub fn clear(&mut self) {
        self.background_services.stop_all();

        self.settings.clear();
        self.pattern_language.clear();
        self.interface.clear();
        self.data_visualizers.clear();
        self.hashes.clear();
        self.providers.clear();
        self.command_palette.clear();
        self.data_inspector.clear();
        self.data_formatters.clear();
        self.file_handlers.clear();
        self.experiments.clear();
        self.network_endpoints.clear();
        self.background_services.clear();
        self.startup_tasks.clear();
    }
}
