use anvil::builtin;
use anvil::config::{Config, SettingsFile};
use anvil::host::Host;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Anvil - loads plugins and serves their registered content
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Additional plugin folder, searched after the configured ones
    #[arg(short, long = "plugin-dir")]
    plugin_dir: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded plugins and their state
    Plugins,

    /// Run a sub-command contributed by a plugin
    Run {
        key: String,
        args: Vec<String>,
    },

    /// Evaluate a pattern script
    Eval {
        script: PathBuf,

        /// Allow functions marked dangerous for this run
        #[arg(long)]
        allow_dangerous: bool,
    },

    /// Print the current settings values
    Settings {
        /// Also write them to the settings file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so command output stays machine readable
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load_default()?
    };

    let mut host = Host::new().context("Failed to create host")?;
    if let Some(version) = &config.host.version_override {
        host.set_version(version.clone());
    }

    if config.plugins.load_builtin {
        host.add_builtin(builtin::entry_points());
    }

    for folder in config.plugins.directories.iter().chain(&args.plugin_dir) {
        if !host.load_plugin_dir(folder) {
            warn!("No plugins loaded from '{}'", folder.display());
        }
    }

    let settings_path = config.settings_path()?;
    host.load_settings(SettingsFile::load(&settings_path)?)?;

    let report = host.boot()?;
    info!(
        "Loaded {} plugin(s), {} language function(s)",
        report.plugins.initialized.len(),
        report.language_functions
    );

    if config.background_services.enabled {
        host.start_services(Duration::from_millis(config.background_services.interval_ms))?;
    }

    match args.command.unwrap_or(Command::Plugins) {
        Command::Plugins => {
            let statuses = host.plugin_statuses();
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        Command::Run { key, args } => {
            host.run_sub_command(&key, &args)?;
        }
        Command::Eval {
            script,
            allow_dangerous,
        } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script '{}'", script.display()))?;

            host.set_allow_dangerous(allow_dangerous || config.pattern_language.allow_dangerous_functions)?;
            if let Some(result) = host.evaluate(&source)? {
                println!("{result}");
            }
        }
        Command::Settings { save } => {
            let settings = host.store_settings();
            println!("{}", serde_json::to_string_pretty(&settings)?);

            if save {
                SettingsFile::save(&settings_path, &settings)?;
                info!("Settings written to '{}'", settings_path.display());
            }
        }
    }

    Ok(())
}
