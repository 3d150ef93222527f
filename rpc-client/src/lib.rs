//! Hello gRPC client resolving its target through Polaris.
//!
//! The binary parses `<namespace> <service> <target> <sendCount> <sendInterval> [<metadata>]`,
//! dials `polaris://<target>` through [`resolver::PolarisResolver`] and sends
//! `sendCount` unary `SayHello` calls with [`grpc::run_calls`].

#[macro_use]
pub mod discovery;
#[macro_use]
pub mod grpc;
#[macro_use]
pub mod resolver;

pub mod cli;
pub mod config;
pub mod logger;
pub mod metadata;
pub mod target;

pub use crate::cli::Cli;
pub use crate::config::Config;
pub use clap::Parser;

use std::collections::BTreeMap;

/// Label the sample attaches to its own service for rule matching
pub const SOURCE_FLAG: (&str, &str) = ("flag", "test");

/// Resolver settings for a parsed command line
pub fn resolver_conf(cli: &Cli, config: &Config) -> resolver::ResolverConf {
    resolver::ResolverConf {
        sync_interval: cli.sync_interval(),
        connect_timeout: config.polaris_connect_timeout(),
        source_service: resolver::SourceService {
            namespace: cli.namespace.clone(),
            service: cli.service.clone(),
            metadata: BTreeMap::from([(SOURCE_FLAG.0.to_owned(), SOURCE_FLAG.1.to_owned())]),
        },
        header_prefix: config.header_prefix(),
    }
}

/// Call loop settings for a parsed command line
pub fn call_plan(cli: &Cli, config: &Config, resolver_conf: &resolver::ResolverConf) -> grpc::CallPlan {
    grpc::CallPlan {
        send_count: cli.send_count(),
        call_delay: config.call_delay(),
        call_timeout: config.call_timeout(),
        request_name: config.request_name.clone(),
        source_service: resolver_conf.source_service.clone(),
    }
}
