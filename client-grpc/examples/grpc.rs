//! gRPC client implementation

use hello_client_grpc::get_endpoint_from_env;
use hello_client_grpc::prelude::*;

/// Example hello-client-grpc
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host, port) = get_endpoint_from_env("SERVER_HOSTNAME", "SERVER_PORT_GRPC");
    let address = format!("http://{host}:{port}");
    println!("NOTE: Ensure the server is running on {address} or this example will fail.");

    let mut client = HelloClient::connect(address).await?;
    println!("Connection created");

    let response = client
        .say_hello(tonic::Request::new(HelloRequest {
            name: String::from("polaris"),
        }))
        .await?;

    println!("RESPONSE={:?}", response.into_inner());

    Ok(())
}
