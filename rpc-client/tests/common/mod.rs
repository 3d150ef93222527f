//! Shared helpers: an in-process Polaris discover endpoint and hello server

#![allow(dead_code)]

use hello_client_grpc::prelude::*;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

/// Answers a decoded discover request with a status and a JSON body
pub type Handler = Arc<dyn Fn(Value) -> (StatusCode, Value) + Send + Sync>;

/// Mock Polaris server, counts the requests it served
pub struct MockPolaris {
    pub address: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl MockPolaris {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a discover endpoint on an ephemeral port
pub async fn start_polaris(handler: Handler) -> MockPolaris {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let make_svc = make_service_fn(move |_conn| {
        let handler = Arc::clone(&handler);
        let counter = Arc::clone(&counter);
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let handler = Arc::clone(&handler);
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if req.uri().path() != "/v1/Discover" {
                        return Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(StatusCode::NOT_FOUND)
                                .body(Body::empty())
                                .unwrap(),
                        );
                    }
                    let bytes = hyper::body::to_bytes(req.into_body()).await?;
                    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
                    let (status, reply) = handler(body);
                    Ok(Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .body(Body::from(reply.to_string()))
                        .unwrap())
                }
            }))
        }
    });

    let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
    let address = server.local_addr();
    tokio::spawn(server);

    MockPolaris { address, hits }
}

/// A successful discover answer
pub fn discover_reply(revision: &str, instances: Vec<Value>) -> Value {
    json!({
        "code": 200000,
        "info": "execute success",
        "type": "INSTANCE",
        "service": {"name": "hello", "namespace": "Test", "revision": revision},
        "instances": instances,
    })
}

/// An instance entry of a discover answer
pub fn instance_json(address: SocketAddr, metadata: Value) -> Value {
    json!({
        "id": format!("{address}"),
        "host": address.ip().to_string(),
        "port": address.port(),
        "weight": 100,
        "healthy": true,
        "isolate": false,
        "metadata": metadata,
    })
}

/// An address nothing listens on
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("could not bind test listener");
    listener.local_addr().expect("no local address")
}

#[derive(Debug, Default)]
struct HelloImpl {}

#[tonic::async_trait]
impl Hello for HelloImpl {
    async fn say_hello(
        &self,
        request: tonic::Request<HelloRequest>,
    ) -> Result<tonic::Response<HelloResponse>, tonic::Status> {
        let source = request
            .metadata()
            .get("x-source-service")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_owned();
        let name = request.into_inner().name;
        Ok(tonic::Response::new(HelloResponse {
            message: format!("hello {name} from {source}"),
        }))
    }
}

/// Starts a hello server on an ephemeral port
pub async fn start_hello_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("could not bind test listener");
    let address = listener.local_addr().expect("no local address");
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(HelloServer::new(HelloImpl::default()))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
    });

    address
}
