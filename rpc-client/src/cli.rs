//! # Cli
//!
//! Command line arguments of the `rpc-client` binary.

use crate::metadata::Metadata;
use crate::target::Target;
use clap::Parser;
use std::time::Duration;

/// Sync interval used when `send_interval` is zero
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// struct holding cli configuration options
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rpc-client",
    about = "Calls the Hello service through a Polaris resolved target"
)]
pub struct Cli {
    /// Namespace of the calling service
    pub namespace: String,

    /// Name of the calling service
    pub service: String,

    /// Target to call, `<Development|Production|Pre-release|Test>/<ServiceName>`
    pub target: Target,

    /// Number of calls to send, none when zero or less
    #[arg(allow_negative_numbers = true)]
    pub send_count: i64,

    /// Interval in seconds between two refreshes of the discovered instances
    #[arg(allow_negative_numbers = true)]
    pub send_interval: i64,

    /// Destination metadata used for routing, `k1:v1,k2:v2,...`
    #[arg(allow_hyphen_values = true)]
    pub metadata: Option<Metadata>,

    /// Ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl Cli {
    /// Calls to send
    pub fn send_count(&self) -> usize {
        usize::try_from(self.send_count).unwrap_or(0)
    }

    /// Background sync interval of the resolver
    pub fn sync_interval(&self) -> Duration {
        match self.send_interval {
            secs if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
            _ => DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Destination metadata, empty when not given
    pub fn metadata(&self) -> Metadata {
        self.metadata.clone().unwrap_or_default()
    }
}
