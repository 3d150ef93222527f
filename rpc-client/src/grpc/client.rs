//! gRPC client helpers implementation

use super::HelloCaller;
use crate::resolver::SourceService;
use hello_client_grpc::prelude::{HelloClient, HelloRequest, HelloResponse};
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};
use tonic::transport::Channel;
use tonic::{async_trait, Request, Response, Status};

/// Header carrying the namespace of the caller
pub const HEADER_SOURCE_NAMESPACE: &str = "x-source-namespace";

/// Header carrying the service name of the caller
pub const HEADER_SOURCE_SERVICE: &str = "x-source-service";

/// Prefix of the headers carrying the caller's metadata
pub const HEADER_SOURCE_META_PREFIX: &str = "x-source-meta-";

#[async_trait]
impl HelloCaller for HelloClient<Channel> {
    async fn call(&mut self, request: Request<HelloRequest>) -> Result<HelloResponse, Status> {
        self.say_hello(request).await.map(Response::into_inner)
    }
}

/// Builds a hello request carrying the caller identity as metadata.
///
/// Labels that are not valid ASCII metadata are left out.
pub fn build_request(name: &str, source: &SourceService) -> Request<HelloRequest> {
    let mut request = Request::new(HelloRequest {
        name: name.to_owned(),
    });

    let mut headers = vec![
        (HEADER_SOURCE_NAMESPACE.to_owned(), source.namespace.as_str()),
        (HEADER_SOURCE_SERVICE.to_owned(), source.service.as_str()),
    ];
    for (key, value) in &source.metadata {
        headers.push((
            format!("{HEADER_SOURCE_META_PREFIX}{}", key.to_ascii_lowercase()),
            value.as_str(),
        ));
    }

    for (key, value) in headers {
        let Ok(key) = AsciiMetadataKey::from_bytes(key.as_bytes()) else {
            grpc_warn!("(build_request) skipping invalid metadata key {}.", key);
            continue;
        };
        let Ok(value) = value.parse::<AsciiMetadataValue>() else {
            grpc_warn!("(build_request) skipping invalid metadata value for {}.", key.as_str());
            continue;
        };
        request.metadata_mut().insert(key, value);
    }

    request
}
