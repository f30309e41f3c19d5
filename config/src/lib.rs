#[macro_use]
extern crate tracing;

mod app_config;
mod args;
pub mod duration;

use app_config::AppConfig;
pub use app_config::get_config_dir;
pub use args::Args;
use eyre::{
    eyre,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    path::Path,
    time::Duration,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    app_config: AppConfig,
    pub listen_address: SocketAddr,
    pub command: String,
    #[serde(default)]
    pub command_args: Vec<String>,
    #[serde(with = "duration::humantime_serde")]
    pub interval: Duration,
    #[serde(with = "duration::humantime_serde")]
    pub command_timeout: Duration,
    #[serde(default)]
    pub verbose: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        cache.insert("listen_address".to_string(), self.listen_address.to_string().into());
        cache.insert("command".to_string(), self.command.clone().into());
        cache.insert(
            "command_args".to_string(),
            self.command_args
                .iter()
                .map(|arg| config::Value::from(arg.clone()))
                .collect::<Vec<_>>()
                .into(),
        );
        cache.insert("interval".to_string(), duration::format(self.interval).into());
        cache.insert(
            "command_timeout".to_string(),
            duration::format(self.command_timeout).into(),
        );
        cache.insert("verbose".to_string(), self.verbose.into());
        Ok(cache)
    }
}

impl Config {
    /// Layers, lowest priority first: built-in defaults, the YAML config file,
    /// `TIREX_EXPORTER_*` environment variables, command-line arguments.
    ///
    /// An explicit `--config-file` must exist; the default one is optional.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(Config::default());

        builder = match &args.config_file {
            Some(path) => builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            ),
            None => builder.add_source(
                config::File::from(config_dir.join("config.yaml"))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            ),
        };

        builder = builder
            .add_source(
                config::Environment::with_prefix(app_config::PROJECT_NAME.as_str())
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("command_args"),
            )
            .add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    /// Rejects settings that would stall or drift the sampling cadence.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(eyre!("config.command must be non-empty"));
        }
        if self.interval.is_zero() {
            return Err(eyre!("config.interval must be greater than zero"));
        }
        if self.command_timeout.is_zero() {
            return Err(eyre!("config.command_timeout must be greater than zero"));
        }
        if self.command_timeout >= self.interval {
            return Err(eyre!(
                "config.command_timeout ({}) must be shorter than config.interval ({})",
                duration::format(self.command_timeout),
                duration::format(self.interval),
            ));
        }
        debug!(config = ?self, "configuration is valid");
        Ok(())
    }
}
