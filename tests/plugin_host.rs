use anvil::host::Host;
use anvil::plugins::abi::{
    GET_COMPATIBLE_VERSION, GET_PLUGIN_NAME, INITIALIZE_LIBRARY, INITIALIZE_PLUGIN,
};
use anvil::plugins::{LoadError, ModuleHandle, ModuleLoader, PluginError, PluginManager};
use anvil::registry::pattern_language::{Literal, ParameterCount};
use anvil::registry::settings::Checkbox;
use anvil::registry::ExtensionRegistry;
use std::collections::HashMap;
use std::ffi::{c_char, c_void};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const HOST_VERSION: &str = "1.2.0";

/// Symbol tables keyed by module file name. Files not listed fail to open.
#[derive(Default, Clone)]
struct FakeLoader {
    modules: HashMap<String, Vec<(&'static str, usize)>>,
}

struct FakeModule {
    symbols: Vec<(&'static str, usize)>,
}

impl FakeLoader {
    fn with(mut self, file: &str, symbols: &[(&'static str, usize)]) -> Self {
        self.modules.insert(file.to_string(), symbols.to_vec());
        self
    }
}

impl ModuleLoader for FakeLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn ModuleHandle>, LoadError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.modules.get(&name) {
            Some(symbols) => Ok(Box::new(FakeModule {
                symbols: symbols.clone(),
            })),
            None => Err(LoadError::new(path, "invalid ELF header", None)),
        }
    }
}

impl ModuleHandle for FakeModule {
    fn resolve(&self, symbol: &str) -> Option<*mut c_void> {
        self.symbols
            .iter()
            .find(|(name, _)| *name == symbol)
            .map(|(_, address)| *address as *mut c_void)
    }
}

extern "C-unwind" fn library_init() {}

extern "C-unwind" fn app_init(registry: *mut ExtensionRegistry) {
    let registry = unsafe { &mut *registry };
    registry
        .pattern_language
        .add_function("fake", "answer", ParameterCount::None, |_| Ok(Some(Literal::Integer(42))));
    registry.experiments.add_experiment("fake.app", "fake.app.name", "fake.app.desc");
}

extern "C-unwind" fn settings_init(registry: *mut ExtensionRegistry) {
    let registry = unsafe { &mut *registry };
    registry.settings.add("fake.settings", "", "fake.settings.flag", Checkbox::new(true));
}

extern "C-unwind" fn panicking_init(_registry: *mut ExtensionRegistry) {
    panic!("plugin exploded");
}

extern "C" fn version_current() -> *const c_char {
    b"1.2.0\0".as_ptr().cast()
}

extern "C" fn version_old() -> *const c_char {
    b"1.1.0\0".as_ptr().cast()
}

extern "C" fn version_empty() -> *const c_char {
    b"\0".as_ptr().cast()
}

macro_rules! name_fn {
    ($ident:ident, $name:literal) => {
        extern "C" fn $ident() -> *const c_char {
            concat!($name, "\0").as_ptr().cast()
        }
    };
}

name_fn!(name_app, "App");
name_fn!(name_settings, "Settings");
name_fn!(name_old, "Old");
name_fn!(name_panicking, "Panicking");
name_fn!(name_unversioned, "Unversioned");

fn address<F>(function: F) -> usize {
    assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
    unsafe { std::mem::transmute_copy(&function) }
}

fn app(name: extern "C" fn() -> *const c_char, init: extern "C-unwind" fn(*mut ExtensionRegistry)) -> Vec<(&'static str, usize)> {
    vec![
        (INITIALIZE_PLUGIN, address(init)),
        (GET_PLUGIN_NAME, address(name)),
        (GET_COMPATIBLE_VERSION, address(version_current as extern "C" fn() -> *const c_char)),
    ]
}

fn library() -> Vec<(&'static str, usize)> {
    vec![(INITIALIZE_LIBRARY, address(library_init as extern "C-unwind" fn()))]
}

/// A plugin folder holding empty files with the given names
fn plugin_folder(files: &[&str]) -> TempDir {
    let dir = tempdir().unwrap();
    for file in files {
        std::fs::write(dir.path().join(file), b"").unwrap();
    }
    dir
}

fn file_names(manager: &PluginManager) -> Vec<String> {
    manager
        .plugins()
        .iter()
        .filter_map(|plugin| plugin.path())
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn standard_loader() -> FakeLoader {
    FakeLoader::default()
        .with("a_app.anvilplug", &app(name_app, app_init))
        .with("b_settings.anvilplug", &app(name_settings, settings_init))
        .with("z_shared.anvilpluglib", &library())
}

#[test]
fn test_libraries_load_before_applications() {
    let dir = plugin_folder(&["a_app.anvilplug", "b_settings.anvilplug", "z_shared.anvilpluglib"]);
    let mut manager = PluginManager::with_loader(Box::new(standard_loader()));

    assert!(manager.load(dir.path()));
    assert_eq!(
        file_names(&manager),
        vec!["z_shared.anvilpluglib", "a_app.anvilplug", "b_settings.anvilplug"]
    );
    assert!(manager.plugins()[0].is_library_plugin());
}

#[test]
fn test_invalid_and_foreign_files_are_dropped() {
    let dir = plugin_folder(&["a_app.anvilplug", "broken.anvilplug", "empty.anvilplug", "readme.md"]);
    let loader = standard_loader()
        .with("empty.anvilplug", &[(GET_PLUGIN_NAME, address(name_app as extern "C" fn() -> *const c_char))])
        .with("readme.md", &app(name_app, app_init));

    let mut manager = PluginManager::with_loader(Box::new(loader));
    assert!(manager.load(dir.path()));
    assert_eq!(file_names(&manager), vec!["a_app.anvilplug"]);
}

#[test]
fn test_missing_folder_leaves_plugins_untouched() {
    let dir = plugin_folder(&["a_app.anvilplug"]);
    let mut manager = PluginManager::with_loader(Box::new(standard_loader()));
    assert!(manager.load(dir.path()));

    assert!(!manager.load(dir.path().join("missing")));
    assert_eq!(manager.plugins().len(), 1);
    assert_eq!(manager.plugin_paths(), &[dir.path().to_path_buf()]);
}

#[test]
fn test_boot_initializes_every_valid_plugin() {
    let dir = plugin_folder(&["a_app.anvilplug", "b_settings.anvilplug", "z_shared.anvilpluglib"]);
    let mut host = Host::with_loader(Box::new(standard_loader())).unwrap();
    host.set_version(HOST_VERSION);
    assert!(host.load_plugin_dir(dir.path()));

    let report = host.boot().unwrap();
    assert!(report.plugins.is_clean());
    assert_eq!(report.plugins.initialized, vec!["Library Plugin", "App", "Settings"]);
    assert_eq!(host.plugins().active_plugins().count(), 3);

    assert!(host.registry().experiments.get("fake.app").is_some());
    assert!(host.registry().settings.entry("fake.settings", "fake.settings.flag").is_some());
    assert_eq!(host.evaluate("return fake.answer()").unwrap(), Some(Literal::Integer(42)));
}

#[test]
fn test_version_mismatch_is_loaded_but_inactive() {
    let dir = plugin_folder(&["old.anvilplug", "unversioned.anvilplug"]);
    let loader = FakeLoader::default()
        .with(
            "old.anvilplug",
            &[
                (INITIALIZE_PLUGIN, address(app_init as extern "C-unwind" fn(*mut ExtensionRegistry))),
                (GET_PLUGIN_NAME, address(name_old as extern "C" fn() -> *const c_char)),
                (GET_COMPATIBLE_VERSION, address(version_old as extern "C" fn() -> *const c_char)),
            ],
        )
        .with(
            "unversioned.anvilplug",
            &[
                (INITIALIZE_PLUGIN, address(settings_init as extern "C-unwind" fn(*mut ExtensionRegistry))),
                (GET_PLUGIN_NAME, address(name_unversioned as extern "C" fn() -> *const c_char)),
                (GET_COMPATIBLE_VERSION, address(version_empty as extern "C" fn() -> *const c_char)),
            ],
        );

    let mut host = Host::with_loader(Box::new(loader)).unwrap();
    host.set_version(HOST_VERSION);
    host.load_plugin_dir(dir.path());

    let report = host.boot().unwrap();
    assert_eq!(
        report.plugins.failed,
        vec![PluginError::VersionMismatch {
            plugin: "Old".to_string(),
            requested: "1.1.0".to_string(),
            host: HOST_VERSION.to_string(),
        }]
    );
    assert_eq!(report.plugins.initialized, vec!["Unversioned"]);

    assert_eq!(host.plugins().plugins().len(), 2);
    let active: Vec<_> = host.plugins().active_plugins().map(|plugin| plugin.name()).collect();
    assert_eq!(active, vec!["Unversioned"]);
    assert!(host.registry().experiments.get("fake.app").is_none());
}

#[test]
fn test_panicking_plugin_does_not_stop_the_rest() {
    let dir = plugin_folder(&["a_panicking.anvilplug", "b_settings.anvilplug"]);
    let loader = standard_loader().with("a_panicking.anvilplug", &app(name_panicking, panicking_init));

    let mut host = Host::with_loader(Box::new(loader)).unwrap();
    host.set_version(HOST_VERSION);
    host.load_plugin_dir(dir.path());

    let report = host.boot().unwrap();
    assert_eq!(report.plugins.initialized, vec!["Settings"]);
    assert!(matches!(
        &report.plugins.failed[..],
        [PluginError::Initialization { plugin, reason }] if plugin == "Panicking" && reason == "plugin exploded"
    ));
}

#[test]
fn test_reload_restores_the_same_state() {
    let dir = plugin_folder(&["a_app.anvilplug", "b_settings.anvilplug", "z_shared.anvilpluglib"]);
    let mut host = Host::with_loader(Box::new(standard_loader())).unwrap();
    host.set_version(HOST_VERSION);
    host.load_plugin_dir(dir.path());
    host.boot().unwrap();

    let names = |host: &Host| -> Vec<String> { host.plugins().plugins().iter().map(|plugin| plugin.name()).collect() };
    let before = names(&host);
    let functions = host.registry().pattern_language.functions().len();
    let categories = host.registry().settings.categories().len();

    let report = host.reload_plugins().unwrap();
    assert!(report.plugins.is_clean());

    assert_eq!(names(&host), before);
    assert_eq!(host.registry().pattern_language.functions().len(), functions);
    assert_eq!(host.registry().settings.categories().len(), categories);
    assert_eq!(host.plugins().plugin_paths(), &[PathBuf::from(dir.path())]);
}

#[test]
fn test_settings_persist_through_the_settings_file() {
    let dir = tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");

    let mut host = Host::new().unwrap();
    host.add_builtin(anvil::builtin::entry_points());
    host.load_settings(anvil::config::SettingsFile::load(&settings_path).unwrap())
        .unwrap();
    host.boot().unwrap();

    let mut stored = host.store_settings();
    stored["hex.builtin.setting.hex_editor"]["hex.builtin.setting.hex_editor.bytes_per_row"] = 8.into();
    anvil::config::SettingsFile::save(&settings_path, &stored).unwrap();

    let mut host = Host::new().unwrap();
    host.add_builtin(anvil::builtin::entry_points());
    host.load_settings(anvil::config::SettingsFile::load(&settings_path).unwrap())
        .unwrap();
    host.boot().unwrap();

    assert_eq!(
        host.store_settings()["hex.builtin.setting.hex_editor"]["hex.builtin.setting.hex_editor.bytes_per_row"],
        8
    );
}

#[test]
fn test_manager_reload_follows_folder_contents() {
    let dir = plugin_folder(&["a_app.anvilplug", "b_settings.anvilplug"]);
    let mut manager = PluginManager::with_loader(Box::new(standard_loader()));
    assert!(manager.load(dir.path()));
    assert_eq!(file_names(&manager), vec!["a_app.anvilplug", "b_settings.anvilplug"]);

    std::fs::remove_file(dir.path().join("b_settings.anvilplug")).unwrap();
    std::fs::write(dir.path().join("z_shared.anvilpluglib"), b"").unwrap();

    manager.reload();
    assert_eq!(file_names(&manager), vec!["z_shared.anvilpluglib", "a_app.anvilplug"]);
    assert_eq!(manager.plugin_paths(), &[PathBuf::from(dir.path())]);
    assert!(manager.plugins().iter().all(|plugin| !plugin.is_initialized()));
}

#[test]
fn test_builtin_sits_beside_folder_plugins() {
    let dir = plugin_folder(&["a_app.anvilplug", "broken.anvilplug"]);
    let mut host = Host::with_loader(Box::new(standard_loader())).unwrap();
    host.set_version(HOST_VERSION);
    assert!(host.add_builtin(anvil::builtin::entry_points()));
    assert!(host.load_plugin_dir(dir.path()));

    let names = |host: &Host| -> Vec<String> { host.plugins().plugins().iter().map(|plugin| plugin.name()).collect() };
    assert_eq!(names(&host), vec!["Built-in", "App"]);

    let report = host.boot().unwrap();
    assert!(report.plugins.is_clean());
    assert_eq!(report.plugins.initialized, vec!["Built-in", "App"]);

    let report = host.reload_plugins().unwrap();
    assert!(report.plugins.is_clean());
    assert_eq!(names(&host), vec!["Built-in", "App"]);
    assert_eq!(host.evaluate("return fake.answer()").unwrap(), Some(Literal::Integer(42)));
    assert!(host.registry().hashes.len() > 0);
}
