//! Service router
//!
//! Narrows a discovery result down to the instances a call may use.

use super::Instance;
use crate::metadata::Metadata;
use std::fmt;
use std::sync::Arc;

/// Routers of the chain, applied in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    /// Drops unhealthy and isolated instances
    Health,
    /// Keeps instances carrying the destination metadata
    DstMeta,
    /// Rule based routing, declared for completeness but not evaluated
    RuleBased,
}

impl fmt::Display for RouterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouterKind::Health => "healthRouter",
            RouterKind::DstMeta => "dstMetaRouter",
            RouterKind::RuleBased => "ruleBasedRouter",
        };
        f.write_str(name)
    }
}

/// Router chain used by the resolver
#[derive(Debug, Clone)]
pub struct ServiceRouter {
    chain: Vec<RouterKind>,
    enable_recover_all: bool,
    metadata: Metadata,
}

impl ServiceRouter {
    /// Creates the sample's chain: metadata routing followed by rule routing,
    /// behind the health filter.
    pub fn new(metadata: Metadata, enable_recover_all: bool) -> Self {
        ServiceRouter {
            chain: vec![RouterKind::Health, RouterKind::DstMeta, RouterKind::RuleBased],
            enable_recover_all,
            metadata,
        }
    }

    /// Routers applied, in order
    pub fn chain(&self) -> &[RouterKind] {
        &self.chain
    }

    /// Applies every router of the chain to `instances`
    pub fn route(&self, instances: &[Arc<Instance>]) -> Vec<Arc<Instance>> {
        let mut candidates = instances.to_vec();
        for router in &self.chain {
            candidates = match router {
                RouterKind::Health => self.route_health(candidates),
                RouterKind::DstMeta => self.route_dst_meta(candidates),
                RouterKind::RuleBased => candidates,
            };
        }

        candidates
    }

    fn route_health(&self, instances: Vec<Arc<Instance>>) -> Vec<Arc<Instance>> {
        let healthy: Vec<Arc<Instance>> = instances
            .iter()
            .filter(|i| i.healthy && !i.isolated)
            .cloned()
            .collect();

        if healthy.is_empty() && self.enable_recover_all {
            discovery_warn!(
                "(route_health) no healthy instance, recovering all {} instances.",
                instances.len()
            );
            return instances;
        }

        healthy
    }

    fn route_dst_meta(&self, instances: Vec<Arc<Instance>>) -> Vec<Arc<Instance>> {
        if self.metadata.is_empty() {
            return instances;
        }

        instances
            .into_iter()
            .filter(|i| {
                self.metadata
                    .iter()
                    .all(|(k, v)| i.metadata.get(k).map(String::as_str) == Some(v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{instance, labelled};
    use super::*;

    fn unhealthy(host: &str, port: u16) -> Arc<Instance> {
        let mut i = (*instance(host, port)).clone();
        i.healthy = false;
        Arc::new(i)
    }

    fn isolated(host: &str, port: u16) -> Arc<Instance> {
        let mut i = (*instance(host, port)).clone();
        i.isolated = true;
        Arc::new(i)
    }

    #[test]
    fn test_router_chain() {
        let router = ServiceRouter::new(Metadata::default(), false);
        assert_eq!(
            router.chain(),
            &[RouterKind::Health, RouterKind::DstMeta, RouterKind::RuleBased]
        );
        assert_eq!(RouterKind::DstMeta.to_string(), "dstMetaRouter");
    }

    #[test]
    fn test_route_drops_unhealthy() {
        let router = ServiceRouter::new(Metadata::default(), false);
        let good = instance("127.0.0.1", 8080);
        let routed = router.route(&[
            good.clone(),
            unhealthy("127.0.0.2", 8080),
            isolated("127.0.0.3", 8080),
        ]);
        assert_eq!(routed, vec![good]);
    }

    #[test]
    fn test_route_recover_all() {
        let all = vec![unhealthy("127.0.0.1", 8080), isolated("127.0.0.2", 8080)];

        let router = ServiceRouter::new(Metadata::default(), false);
        assert!(router.route(&all).is_empty());

        let router = ServiceRouter::new(Metadata::default(), true);
        assert_eq!(router.route(&all), all);
    }

    #[test]
    fn test_route_dst_meta() {
        let metadata: Metadata = "env:gray".parse().unwrap();
        let router = ServiceRouter::new(metadata, false);

        let gray = labelled("127.0.0.1", 8080, &[("env", "gray"), ("zone", "a")]);
        let blue = labelled("127.0.0.2", 8080, &[("env", "blue")]);
        let plain = instance("127.0.0.3", 8080);

        let routed = router.route(&[gray.clone(), blue, plain]);
        assert_eq!(routed, vec![gray]);
    }

    #[test]
    fn test_route_dst_meta_no_match() {
        let metadata: Metadata = "env:gray,zone:b".parse().unwrap();
        let router = ServiceRouter::new(metadata, true);

        let routed = router.route(&[labelled("127.0.0.1", 8080, &[("env", "gray"), ("zone", "a")])]);
        assert!(routed.is_empty());
    }
}
