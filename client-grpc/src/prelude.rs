//! Re-export of used objects

pub use super::client as hello;
pub use hello::hello_client::HelloClient;
pub use hello::hello_server::{Hello, HelloServer};
pub use hello::{HelloRequest, HelloResponse};
