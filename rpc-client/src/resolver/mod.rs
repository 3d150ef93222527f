//! Polaris resolver
//!
//! Turns a `polaris://<namespace>/<service>` target into a load balanced
//! [`Channel`] whose endpoint set is kept in sync with the naming service by a
//! background task.

#[macro_use]
pub mod macros;

use crate::discovery::{
    Discover, Discovered, DiscoveryError, Instance, ServiceKey, ServiceRouter,
};
use crate::target::Target;
use snafu::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tower::discover::Change;

/// Capacity of the change queue between the sync task and the channel
const BALANCE_CAPACITY: usize = 64;

/// Errors raised by the resolver
#[derive(Debug, Snafu)]
pub enum ResolverError {
    /// The naming service could not be queried
    #[snafu(display("Could not discover {service}: {source}"))]
    Discovery {
        service: String,
        source: DiscoveryError,
    },

    /// A discovered instance does not form a valid endpoint
    #[snafu(display("Invalid endpoint {address}: {source}"))]
    InvalidEndpoint {
        address: String,
        source: tonic::transport::Error,
    },

    /// The channel fed by the resolver was dropped
    #[snafu(display("The channel for {service} is closed."))]
    ChannelClosed { service: String },
}

/// The calling service, attached to outgoing calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceService {
    pub namespace: String,
    pub service: String,
    pub metadata: BTreeMap<String, String>,
}

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConf {
    /// Interval between two discovery rounds
    pub sync_interval: Duration,
    /// Connect timeout of every endpoint handed to the channel
    pub connect_timeout: Duration,
    /// Identity of the caller
    pub source_service: SourceService,
    /// Prefixes of the request headers rule based routing may match on
    pub header_prefix: Vec<String>,
}

/// Endpoint set currently known for a service
#[derive(Debug, Default)]
pub struct InstanceSet {
    revision: Option<String>,
    instances: Vec<Arc<Instance>>,
}

impl InstanceSet {
    /// Revision of the last applied discovery result
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Instances in use
    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }

    /// Replaces the set with `routed` and returns what changed.
    pub fn apply(&mut self, revision: String, routed: Vec<Arc<Instance>>) -> crate::discovery::Change {
        let change = crate::discovery::diff_instances(&self.instances, &routed);
        self.revision = Some(revision);
        self.instances = routed;
        change
    }
}

/// Resolves Polaris targets for the dial path
#[derive(Debug)]
pub struct PolarisResolver<D> {
    discover: Arc<D>,
    router: ServiceRouter,
    conf: ResolverConf,
}

impl<D: Discover> PolarisResolver<D> {
    /// Creates a new resolver
    pub fn new(discover: D, router: ServiceRouter, conf: ResolverConf) -> Self {
        PolarisResolver {
            discover: Arc::new(discover),
            router,
            conf,
        }
    }

    /// Resolver settings
    pub fn conf(&self) -> &ResolverConf {
        &self.conf
    }

    /// Dials `target`.
    ///
    /// The first discovery round runs before returning; a naming service that
    /// can not be reached is only logged, the background task keeps retrying.
    /// Endpoint changes are handed to the channel by the returned task, which
    /// runs until `token` is cancelled or the channel is dropped.
    pub async fn dial(
        &self,
        target: &Target,
        token: CancellationToken,
    ) -> Result<(Channel, JoinHandle<()>), ResolverError> {
        resolver_info!(
            "(dial) entry for {}, routing header prefixes {:?}.",
            target.dial_uri(),
            self.conf.header_prefix
        );

        let mut task = SyncTask {
            discover: Arc::clone(&self.discover),
            router: self.router.clone(),
            key: ServiceKey {
                namespace: target.namespace.clone(),
                service: target.service.clone(),
            },
            state: InstanceSet::default(),
            connect_timeout: self.conf.connect_timeout,
            sync_interval: self.conf.sync_interval,
        };

        let initial = match task.refresh().await {
            Ok(changes) => changes,
            Err(e @ ResolverError::Discovery { .. }) => {
                resolver_warn!("(dial) first discovery failed, will retry: {}", e);
                vec![]
            }
            Err(e) => {
                resolver_error!("(dial) could not dial {}: {}", target.dial_uri(), e);
                return Err(e);
            }
        };

        // the queue is only drained once calls flow, it must hold the whole
        // first round
        let capacity = BALANCE_CAPACITY.max(initial.len());
        let (channel, sender) = Channel::balance_channel::<String>(capacity);
        let handle = tokio::spawn(task.run(sender, initial, token));
        Ok((channel, handle))
    }
}

/// Background state of a dialed target
struct SyncTask<D> {
    discover: Arc<D>,
    router: ServiceRouter,
    key: ServiceKey,
    state: InstanceSet,
    connect_timeout: Duration,
    sync_interval: Duration,
}

impl<D: Discover> SyncTask<D> {
    /// Pushes `initial`, then refreshes every `sync_interval`.
    ///
    /// Every wait is abandoned as soon as `token` is cancelled, including a
    /// push blocked on a full queue.
    async fn run(
        mut self,
        sender: Sender<Change<String, Endpoint>>,
        initial: Vec<Change<String, Endpoint>>,
        token: CancellationToken,
    ) {
        let service = self.key.to_string();
        // interval panics on a zero period
        let mut ticker = tokio::time::interval(self.sync_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately, dial already synced once
        ticker.tick().await;

        let mut pending = initial;
        loop {
            let pushed = token
                .run_until_cancelled(push(&sender, &service, std::mem::take(&mut pending)))
                .await;
            match pushed {
                None => break,
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    resolver_info!("(run) {} Stopping sync.", e);
                    return;
                }
            }

            if token.run_until_cancelled(ticker.tick()).await.is_none() {
                break;
            }

            match token.run_until_cancelled(self.refresh()).await {
                None => break,
                Some(Ok(changes)) => pending = changes,
                Some(Err(e)) => {
                    resolver_warn!("(run) {}", e);
                }
            }
        }

        resolver_info!("(run) sync of [{}] cancelled.", service);
    }

    /// Runs one discovery round and returns the channel changes it calls for,
    /// removals first.
    async fn refresh(&mut self) -> Result<Vec<Change<String, Endpoint>>, ResolverError> {
        let service = self.key.to_string();
        let discovered = self
            .discover
            .discover(&self.key, self.state.revision())
            .await
            .context(DiscoverySnafu {
                service: service.as_str(),
            })?;

        let Discovered::Changed {
            revision,
            instances,
        } = discovered
        else {
            resolver_debug!(
                "(refresh) [{}] unchanged at revision {:?}.",
                service,
                self.state.revision()
            );
            return Ok(vec![]);
        };

        let routed = self.router.route(&instances);
        if routed.is_empty() {
            resolver_warn!(
                "(refresh) no instance of [{}] left after routing, {} discovered.",
                service,
                instances.len()
            );
        }

        // endpoints are built before the set is replaced, a bad instance
        // leaves the current set untouched
        let mut endpoints = routed
            .iter()
            .map(|instance| Ok((instance.address(), self.endpoint(instance)?)))
            .collect::<Result<HashMap<String, Endpoint>, ResolverError>>()?;

        let change = self.state.apply(revision, routed);
        if change.is_empty() {
            return Ok(vec![]);
        }

        let mut changes = Vec::with_capacity(change.added.len() + change.removed.len());
        for instance in &change.removed {
            changes.push(Change::Remove(instance.address()));
        }
        for instance in &change.added {
            let address = instance.address();
            if let Some(endpoint) = endpoints.remove(&address) {
                changes.push(Change::Insert(address, endpoint));
            }
        }

        resolver_info!(
            "(refresh) [{}] at revision {:?}: {} added, {} removed, {} in use.",
            service,
            self.state.revision(),
            change.added.len(),
            change.removed.len(),
            self.state.instances().len()
        );
        Ok(changes)
    }

    fn endpoint(&self, instance: &Instance) -> Result<Endpoint, ResolverError> {
        let address = instance.address();
        let endpoint = Endpoint::from_shared(format!("http://{address}"))
            .context(InvalidEndpointSnafu { address })?;
        Ok(endpoint.connect_timeout(self.connect_timeout))
    }
}

/// Hands `changes` to the channel in order.
async fn push(
    sender: &Sender<Change<String, Endpoint>>,
    service: &str,
    changes: Vec<Change<String, Endpoint>>,
) -> Result<(), ResolverError> {
    for change in changes {
        sender
            .send(change)
            .await
            .ok()
            .context(ChannelClosedSnafu { service })?;
    }
    Ok(())
}
