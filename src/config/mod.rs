use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub pattern_language: PatternLanguageConfig,
    #[serde(default)]
    pub background_services: BackgroundServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Folders searched for plugins, in load order
    #[serde(default = "default_plugin_directories")]
    pub directories: Vec<PathBuf>,

    /// Register the statically linked builtin plugin
    #[serde(default = "default_true")]
    pub load_builtin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Version reported to plugins instead of the crate version
    #[serde(default)]
    pub version_override: Option<String>,

    /// Where settings values are persisted; `~/.anvil/settings.json` if unset
    #[serde(default)]
    pub settings_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternLanguageConfig {
    #[serde(default)]
    pub allow_dangerous_functions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundServicesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_plugin_directories() -> Vec<PathBuf> {
    Config::config_dir()
        .map(|dir| vec![dir.join("plugins")])
        .unwrap_or_default()
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directories: default_plugin_directories(),
            load_builtin: true,
        }
    }
}

impl Default for BackgroundServicesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file '{}'", path.as_ref().display()))?;

        let config: Config = serde_yaml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// `~/.anvil`
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;

        Ok(home.join(".anvil"))
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// File holding persisted settings values
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.host.settings_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("settings.json")),
        }
    }
}

/// JSON file holding the settings registry's values
pub struct SettingsFile;

impl SettingsFile {
    /// Read the settings tree; a missing file yields an empty object
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Value> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file '{}'", path.display()))?;

        serde_json::from_str(&contents).context("Failed to parse settings file")
    }

    pub fn save<P: AsRef<Path>>(path: P, settings: &Value) -> Result<()> {
        let contents = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write settings file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.plugins.load_builtin);
        assert!(!config.pattern_language.allow_dangerous_functions);
        assert!(config.background_services.enabled);
        assert_eq!(config.background_services.interval_ms, 1000);
        assert!(config.host.version_override.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
plugins:
  directories: ["/opt/anvil/plugins", "/tmp/plugins"]
host:
  version_override: "1.2.0"
pattern_language:
  allow_dangerous_functions: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.plugins.directories.len(), 2);
        assert!(config.plugins.load_builtin);
        assert_eq!(config.host.version_override.as_deref(), Some("1.2.0"));
        assert!(config.pattern_language.allow_dangerous_functions);
        assert!(config.background_services.enabled);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.plugins.directories = vec![PathBuf::from("/plugins")];
        config.background_services.interval_ms = 50;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.plugins.directories, vec![PathBuf::from("/plugins")]);
        assert_eq!(loaded.background_services.interval_ms, 50);
    }

    #[test]
    fn test_settings_path_override() {
        let mut config = Config::default();
        config.host.settings_file = Some(PathBuf::from("/tmp/anvil-settings.json"));
        assert_eq!(config.settings_path().unwrap(), PathBuf::from("/tmp/anvil-settings.json"));
    }

    #[test]
    fn test_settings_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        assert_eq!(SettingsFile::load(&path).unwrap(), json!({}));

        let settings = json!({ "hex.builtin.setting.general": { "hex.builtin.setting.general.show_tips": true } });
        SettingsFile::save(&path, &settings).unwrap();
        assert_eq!(SettingsFile::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(SettingsFile::load(&path).is_err());
    }
}
