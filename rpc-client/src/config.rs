//! # Config
//!
//! Define and implement config options for module

use config::{ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;
use std::time::Duration;

/// struct holding configuration options
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// comma separated list of Polaris server addresses (`host:port`)
    pub polaris_addresses: String,
    /// timeout for a single request to a Polaris server
    pub polaris_connect_timeout_ms: u64,
    /// return every instance when none is healthy
    pub enable_recover_all: bool,
    /// delay between two calls of the call loop
    pub call_delay_ms: u64,
    /// upper bound for a single unary call
    pub call_timeout_ms: u64,
    /// name sent in each hello request
    pub request_name: String,
    /// comma separated prefixes of the request headers rule based routing may match on
    pub header_prefix: String,
    /// path to log configuration YAML file
    pub log_config: String,
}

impl Default for Config {
    fn default() -> Self {
        log::warn!("(Config Default) Creating Config object with default values.");
        Self::new()
    }
}

impl Config {
    /// Default values for Config
    pub fn new() -> Self {
        Config {
            polaris_addresses: String::from("127.0.0.1:8090"),
            polaris_connect_timeout_ms: 2000,
            enable_recover_all: false,
            call_delay_ms: 1500,
            call_timeout_ms: 3000,
            request_name: String::from("polaris"),
            header_prefix: String::from("naming_,tracing_"),
            log_config: String::from("log4rs.yaml"),
        }
    }

    /// Create a new `Config` object using environment variables
    pub fn try_from_env() -> Result<Self, ConfigError> {
        // read .env file if present
        dotenv().ok();
        let default_config = Config::default();

        config::Config::builder()
            .set_default("polaris_addresses", default_config.polaris_addresses)?
            .set_default(
                "polaris_connect_timeout_ms",
                default_config.polaris_connect_timeout_ms,
            )?
            .set_default("enable_recover_all", default_config.enable_recover_all)?
            .set_default("call_delay_ms", default_config.call_delay_ms)?
            .set_default("call_timeout_ms", default_config.call_timeout_ms)?
            .set_default("request_name", default_config.request_name)?
            .set_default("header_prefix", default_config.header_prefix)?
            .set_default("log_config", default_config.log_config)?
            .add_source(Environment::default().try_parsing(true).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Polaris server addresses, in the order they are tried
    pub fn polaris_addresses(&self) -> Vec<String> {
        split_list(&self.polaris_addresses)
    }

    /// Routing header prefixes
    pub fn header_prefix(&self) -> Vec<String> {
        split_list(&self.header_prefix)
    }

    /// Timeout for a single request to a Polaris server
    pub fn polaris_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.polaris_connect_timeout_ms)
    }

    /// Delay between two calls of the call loop
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    /// Upper bound for a single unary call
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
