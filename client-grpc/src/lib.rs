//! Generated gRPC stub for the `Hello` sample service.
//!
//! The service definition lives in `proto/hello.proto`; [`client`] holds the
//! prost messages together with the tonic client and server halves.

pub mod prelude;

/// Client Library: Client Functions, Structs
pub mod client {
    #![allow(unused_qualifications)]
    include!("grpc.rs");
}

/// Fully qualified name of the `Hello` service.
pub const SERVICE_NAME: &str = "grpc.Hello";

/// Reads a host and port pair from the given environment variables.
///
/// Falls back to `localhost` and `50051` when a variable is missing or the
/// port can not be parsed.
pub fn get_endpoint_from_env(host_var: &str, port_var: &str) -> (String, u16) {
    let host = std::env::var(host_var).unwrap_or_else(|_| {
        log::warn!("(get_endpoint_from_env) {} undefined, using default.", host_var);
        String::from("localhost")
    });
    let port = std::env::var(port_var)
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or_else(|| {
            log::warn!("(get_endpoint_from_env) {} undefined or invalid, using default.", port_var);
            50051
        });

    (host, port)
}
