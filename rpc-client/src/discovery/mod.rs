//! Service discovery
//!
//! Abstraction over the naming service used by the resolver, together with the
//! Polaris implementation and the router applied to every discovery result.

#[macro_use]
pub mod macros;
pub mod polaris;
pub mod router;

pub use polaris::PolarisDiscover;
pub use router::ServiceRouter;

use snafu::prelude::Snafu;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tonic::async_trait;

/// [`Instance`] contains information of an instance from the target service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub healthy: bool,
    pub isolated: bool,
    pub metadata: BTreeMap<String, String>,
}

impl Instance {
    /// `host:port` of the instance, IPv6 hosts in brackets
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Identifies a service inside Polaris
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub namespace: String,
    pub service: String,
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service)
    }
}

/// Result of a discovery round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    /// The service changed since the given revision
    Changed {
        revision: String,
        instances: Vec<Arc<Instance>>,
    },
    /// The service is still at the given revision
    Unchanged,
}

/// Errors raised while talking to the naming service
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DiscoveryError {
    /// No naming server address configured
    #[snafu(display("No polaris server address configured."))]
    NoServer,

    /// The request could not be built
    #[snafu(display("Could not build request for {address}: {source}"))]
    InvalidRequest {
        address: String,
        source: hyper::http::Error,
    },

    /// The request failed on the wire
    #[snafu(display("Request to {address} failed: {source}"))]
    Request {
        address: String,
        source: hyper::Error,
    },

    /// The server did not answer in time
    #[snafu(display("Request to {address} timed out after {timeout:?}."))]
    Timeout { address: String, timeout: Duration },

    /// The server answered with an unexpected HTTP status
    #[snafu(display("Unexpected http status {status} from {address}."))]
    HttpStatus {
        address: String,
        status: hyper::StatusCode,
    },

    /// The body could not be decoded or encoded
    #[snafu(display("Could not decode discover response: {source}"))]
    Decode { source: serde_json::Error },

    /// The server refused the request
    #[snafu(display("Discover for {service} failed with code {code}: {info}"))]
    Server {
        service: String,
        code: u32,
        info: String,
    },
}

/// [`Discover`] is the most basic trait for a naming service.
#[async_trait]
pub trait Discover: Send + Sync + 'static {
    /// Looks up the instances of `service`.
    ///
    /// `revision` is the revision of the last answer, if any; implementations
    /// may answer [`Discovered::Unchanged`] when it is still current.
    async fn discover(
        &self,
        service: &ServiceKey,
        revision: Option<&str>,
    ) -> Result<Discovered, DiscoveryError>;
}

/// Difference between two instance lists, compared by address only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Change {
    pub added: Vec<Arc<Instance>>,
    pub removed: Vec<Arc<Instance>>,
}

impl Change {
    /// True when nothing was added or removed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compares `prev` and `next` by address.
///
/// Instances whose weight or metadata changed but kept their address are not
/// reported.
pub fn diff_instances(prev: &[Arc<Instance>], next: &[Arc<Instance>]) -> Change {
    let prev_set: HashSet<String> = prev.iter().map(|i| i.address()).collect();
    let next_set: HashSet<String> = next.iter().map(|i| i.address()).collect();

    let added = next
        .iter()
        .filter(|i| !prev_set.contains(&i.address()))
        .cloned()
        .collect();
    let removed = prev
        .iter()
        .filter(|i| !next_set.contains(&i.address()))
        .cloned()
        .collect();

    Change { added, removed }
}
