//! The builtin plugin: the host's own content, registered through the same
//! entry-point table a module file would export.

mod content;
mod hashes;
mod inspector;
mod pattern;
mod settings;
mod visualizers;

use crate::plugins::abi::{GetListFn, GetStringFn, InitializePluginFn, IsBuiltinFn};
use crate::plugins::{Feature, PluginFunctions, SubCommand};
use crate::registry::ExtensionRegistry;
use once_cell::sync::Lazy;
use std::ffi::{c_char, c_void};
use tracing::{error, info};

static SUB_COMMANDS: Lazy<Vec<SubCommand>> = Lazy::new(|| {
    vec![
        SubCommand::new("version", "Print the host version", |_| {
            println!("anvil {}", crate::host::HOST_VERSION);
        }),
        SubCommand::new("hash", "Print the SHA3-256 digest of each given file", |args| {
            for path in args {
                match std::fs::read(path) {
                    Ok(data) => println!("{}  {}", hex::encode(hashes::sha3_256(&data)), path),
                    Err(err) => error!("Failed to read '{}': {}", path, err),
                }
            }
        }),
    ]
});

static FEATURES: Lazy<Vec<Feature>> = Lazy::new(|| {
    vec![
        Feature::new("Pattern Language", true),
        Feature::new("Network Endpoints", true),
        Feature::new("Custom Fonts", false),
    ]
});

extern "C-unwind" fn initialize_plugin(registry: *mut ExtensionRegistry) {
    // Safety: the host passes an exclusive, valid registry pointer
    let Some(registry) = (unsafe { registry.as_mut() }) else {
        error!("Builtin plugin received a null registry");
        return;
    };

    settings::register(registry);
    hashes::register(registry);
    visualizers::register(registry);
    inspector::register(registry);
    pattern::register(registry);
    content::register(registry);

    registry.on_startup_finished(|registry| {
        info!(
            "Builtin content ready: {} hash(es), {} setting categories",
            registry.hashes.len(),
            registry.settings.categories().len()
        );
    });
}

extern "C" fn plugin_name() -> *const c_char {
    b"Built-in\0".as_ptr().cast()
}

extern "C" fn plugin_author() -> *const c_char {
    b"anvil\0".as_ptr().cast()
}

extern "C" fn plugin_description() -> *const c_char {
    b"Settings, hashes, visualizers, pattern functions and menus shipped with the host\0"
        .as_ptr()
        .cast()
}

extern "C" fn compatible_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

extern "C" fn is_builtin_plugin() -> bool {
    true
}

extern "C" fn sub_commands() -> *const c_void {
    let commands: &Vec<SubCommand> = &SUB_COMMANDS;
    (commands as *const Vec<SubCommand>).cast()
}

extern "C" fn features() -> *const c_void {
    let features: &Vec<Feature> = &FEATURES;
    (features as *const Vec<Feature>).cast()
}

/// Entry points of the builtin plugin, for [`crate::host::Host::add_builtin`]
#[must_use]
pub fn entry_points() -> PluginFunctions {
    PluginFunctions {
        initialize_plugin: Some(initialize_plugin as InitializePluginFn),
        get_plugin_name: Some(plugin_name as GetStringFn),
        get_plugin_author: Some(plugin_author as GetStringFn),
        get_plugin_description: Some(plugin_description as GetStringFn),
        get_compatible_version: Some(compatible_version as GetStringFn),
        is_builtin_plugin: Some(is_builtin_plugin as IsBuiltinFn),
        get_sub_commands: Some(sub_commands as GetListFn),
        get_features: Some(features as GetListFn),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use crate::registry::pattern_language::Literal;
    use crate::registry::provider::{MemoryProvider, Region};

    fn booted() -> Host {
        let mut host = Host::new().unwrap();
        host.add_builtin(entry_points());
        host.boot().unwrap();
        host
    }

    #[test]
    fn test_builtin_boots_cleanly() {
        let host = booted();
        let plugin = &host.plugins().plugins()[0];

        assert_eq!(plugin.name(), "Built-in");
        assert!(plugin.is_builtin());
        assert!(plugin.is_initialized());
        assert_eq!(plugin.features().len(), 3);
        assert!(host.plugins().find_sub_command("hash").is_some());
    }

    #[test]
    fn test_builtin_ignores_version_override() {
        let mut host = Host::new().unwrap();
        host.set_version("1.2.0");
        host.add_builtin(entry_points());

        let report = host.boot().unwrap();
        assert!(report.plugins.is_clean());
        assert_eq!(report.plugins.initialized, vec!["Built-in".to_string()]);
        assert!(host.registry().hashes.len() > 0);
    }

    #[test]
    fn test_builtin_content_is_registered() {
        let host = booted();
        let registry = host.registry();

        assert_eq!(registry.hashes.len(), 3);
        assert!(registry.providers.names().iter().any(|name| name == "hex.builtin.provider.mem_file"));
        assert!(registry.experiments.get("hex.builtin.experiment.parallel_evaluation").is_some());
        assert_eq!(
            host.evaluate("return builtin.std.string.length('abc')").unwrap(),
            Some(Literal::Integer(3))
        );
    }

    #[test]
    fn test_builtin_hash_through_registry() {
        let mut host = Host::new().unwrap();
        host.add_builtin(entry_points());
        host.boot().unwrap();

        assert!(host.registry_mut().is_none());

        let provider = MemoryProvider::new(b"123456789".to_vec());
        let mut crc = host.registry().hashes.create("hex.builtin.hash.crc32", "crc").unwrap();
        assert_eq!(crc.get(Region::new(0, 9), &provider), &[0xCB, 0xF4, 0x39, 0x26]);
    }
}
