//! Polaris naming client
//!
//! Uses the HTTP discover endpoint of the Polaris server,
//! `POST /v1/Discover`, to fetch the instances of a service.

use super::{
    DecodeSnafu, Discover, Discovered, DiscoveryError, HttpStatusSnafu, Instance,
    InvalidRequestSnafu, NoServerSnafu, RequestSnafu, ServerSnafu, ServiceKey, TimeoutSnafu,
};
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tonic::async_trait;

/// Path of the discover endpoint
pub const DISCOVER_PATH: &str = "/v1/Discover";

/// The request was executed and the payload is current
pub const CODE_EXECUTE_SUCCESS: u32 = 200000;

/// The revision sent by the client is still current
pub const CODE_DATA_NO_CHANGE: u32 = 200001;

/// Weight Polaris assigns when an instance does not declare one
const DEFAULT_WEIGHT: u32 = 100;

#[derive(Debug, Serialize)]
struct DiscoverRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    service: ServiceRef<'a>,
}

#[derive(Debug, Serialize)]
struct ServiceRef<'a> {
    name: &'a str,
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiscoverResponse {
    code: u32,
    info: String,
    service: Option<ServiceInfo>,
    instances: Vec<InstanceInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceInfo {
    revision: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstanceInfo {
    id: String,
    host: String,
    port: u16,
    weight: Option<u32>,
    healthy: Option<bool>,
    isolate: Option<bool>,
    metadata: BTreeMap<String, String>,
}

impl From<InstanceInfo> for Instance {
    fn from(info: InstanceInfo) -> Self {
        Instance {
            id: info.id,
            host: info.host,
            port: info.port,
            weight: info.weight.unwrap_or(DEFAULT_WEIGHT),
            healthy: info.healthy.unwrap_or(true),
            isolated: info.isolate.unwrap_or(false),
            metadata: info.metadata,
        }
    }
}

/// [`Discover`] implementation backed by one or more Polaris servers
#[derive(Debug, Clone)]
pub struct PolarisDiscover {
    addresses: Vec<String>,
    timeout: Duration,
    client: Client<HttpConnector>,
}

impl PolarisDiscover {
    /// Creates a new [`PolarisDiscover`] trying `addresses` in order.
    pub fn new(addresses: Vec<String>, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder().build(connector);

        PolarisDiscover {
            addresses,
            timeout,
            client,
        }
    }

    /// Configured server addresses
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    async fn discover_from(
        &self,
        address: &str,
        service: &ServiceKey,
        revision: Option<&str>,
    ) -> Result<Discovered, DiscoveryError> {
        let body = serde_json::to_vec(&DiscoverRequest {
            kind: "INSTANCE",
            service: ServiceRef {
                name: &service.service,
                namespace: &service.namespace,
                revision,
            },
        })
        .context(DecodeSnafu)?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{address}{DISCOVER_PATH}"))
            .header("content-type", "application/json")
            .body(Body::from(body))
            .context(InvalidRequestSnafu { address })?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .context(RequestSnafu { address })?;
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body())
                .await
                .context(RequestSnafu { address })?;
            Ok::<_, DiscoveryError>((status, bytes))
        };

        let (status, bytes) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return TimeoutSnafu {
                    address,
                    timeout: self.timeout,
                }
                .fail()
            }
        };

        // Polaris answers refused requests with a 4xx/5xx status and a regular
        // body, try to decode it first to keep the server's code and info.
        let response = match serde_json::from_slice::<DiscoverResponse>(&bytes) {
            Ok(response) if response.code != 0 => response,
            _ if !status.is_success() => return HttpStatusSnafu { address, status }.fail(),
            other => other.context(DecodeSnafu)?,
        };

        match response.code {
            CODE_EXECUTE_SUCCESS => {
                let revision = response
                    .service
                    .map(|service| service.revision)
                    .unwrap_or_default();
                let instances = response
                    .instances
                    .into_iter()
                    .map(|info| Arc::new(Instance::from(info)))
                    .collect();
                Ok(Discovered::Changed {
                    revision,
                    instances,
                })
            }
            CODE_DATA_NO_CHANGE => Ok(Discovered::Unchanged),
            code => ServerSnafu {
                service: service.to_string(),
                code,
                info: response.info,
            }
            .fail(),
        }
    }
}

#[async_trait]
impl Discover for PolarisDiscover {
    async fn discover(
        &self,
        service: &ServiceKey,
        revision: Option<&str>,
    ) -> Result<Discovered, DiscoveryError> {
        discovery_debug!("(discover) entry for [{}].", service);

        let mut last_error = None;
        for address in &self.addresses {
            match self.discover_from(address, service, revision).await {
                Ok(discovered) => return Ok(discovered),
                // The server answered, asking another one will not help.
                Err(e @ DiscoveryError::Server { .. }) => {
                    discovery_warn!("(discover) {}", e);
                    return Err(e);
                }
                Err(e) => {
                    discovery_warn!("(discover) polaris server {} unusable: {}", address, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => {
                discovery_error!("(discover) no polaris server address configured.");
                NoServerSnafu.fail()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_discover_response() {
        let payload = r#"{
            "code": 200000,
            "info": "execute success",
            "type": "INSTANCE",
            "service": {"name": "echo", "namespace": "Test", "revision": "abc"},
            "instances": [
                {"id": "i-1", "host": "127.0.0.1", "port": 8080, "weight": 50,
                 "healthy": true, "isolate": false, "metadata": {"env": "gray"}},
                {"id": "i-2", "host": "127.0.0.2", "port": 8081}
            ]
        }"#;

        let response: DiscoverResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.code, CODE_EXECUTE_SUCCESS);
        assert_eq!(response.service.unwrap().revision, "abc");

        let instances: Vec<Instance> = response.instances.into_iter().map(Instance::from).collect();
        assert_eq!(instances[0].weight, 50);
        assert_eq!(instances[0].metadata.get("env"), Some(&String::from("gray")));
        assert_eq!(instances[1].address(), "127.0.0.2:8081");
        assert_eq!(instances[1].weight, DEFAULT_WEIGHT);
        assert!(instances[1].healthy);
        assert!(!instances[1].isolated);
    }

    #[test]
    fn test_encode_discover_request() {
        let request = DiscoverRequest {
            kind: "INSTANCE",
            service: ServiceRef {
                name: "echo",
                namespace: "Test",
                revision: None,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "INSTANCE", "service": {"name": "echo", "namespace": "Test"}})
        );
    }

    #[tokio::test]
    async fn test_discover_without_servers() {
        let discover = PolarisDiscover::new(vec![], Duration::from_millis(100));
        let key = ServiceKey {
            namespace: String::from("Test"),
            service: String::from("echo"),
        };
        let result = discover.discover(&key, None).await;
        assert!(matches!(result, Err(DiscoveryError::NoServer)));
    }
}
