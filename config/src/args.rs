use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
    time::Duration,
};

/// Prometheus exporter for the tirex render queue
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Config file to load instead of `<config dir>/config.yaml`.
    #[clap(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Address the `/metrics` endpoint listens on.
    #[clap(long, value_name = "ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Status command to run each cycle (its arguments come from the config file).
    #[clap(long, value_name = "PROGRAM")]
    pub command: Option<String>,

    /// Time between two samples, e.g. `10s`.
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Upper bound for a single status command run, e.g. `5s`.
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub command_timeout: Option<Duration>,

    /// Log at debug level.
    #[clap(long = "verbose", short = 'v', action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use crate::duration;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(listen_address) = &self.listen_address {
                cache.insert("listen_address".to_string(), listen_address.to_string().into());
            }
            if let Some(command) = &self.command {
                cache.insert("command".to_string(), command.clone().into());
            }
            if let Some(interval) = self.interval {
                cache.insert("interval".to_string(), duration::format(interval).into());
            }
            if let Some(command_timeout) = self.command_timeout {
                cache.insert("command_timeout".to_string(), duration::format(command_timeout).into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let version = clap::crate_version!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "\
{version}

Authors: {author}

Config directory: {config_dir_path}"
    )
}
