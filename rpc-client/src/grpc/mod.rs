//! gRPC
//! provides the unary call loop run against the resolved `Hello` service

#[macro_use]
pub mod macros;
pub mod client;

pub use client::build_request;

use crate::resolver::SourceService;
use hello_client_grpc::prelude::{HelloRequest, HelloResponse};
use std::time::Duration;
use tonic::{async_trait, Request, Status};

/// Sends a single unary `SayHello` call
#[async_trait]
pub trait HelloCaller: Send {
    /// Issues the call and returns the decoded reply
    async fn call(&mut self, request: Request<HelloRequest>) -> Result<HelloResponse, Status>;
}

/// What the call loop sends
#[derive(Debug, Clone)]
pub struct CallPlan {
    /// Number of calls
    pub send_count: usize,
    /// Pause after every call
    pub call_delay: Duration,
    /// Upper bound of a single call
    pub call_timeout: Duration,
    /// `name` of every request
    pub request_name: String,
    /// Caller identity attached to every request
    pub source_service: SourceService,
}

/// Outcome of a call loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Issues `plan.send_count` calls, one after the other.
///
/// A failed call is logged and the loop goes on with the next one.
pub async fn run_calls<C: HelloCaller>(caller: &mut C, plan: &CallPlan) -> CallSummary {
    grpc_info!("(run_calls) sending {} messages.", plan.send_count);

    let mut summary = CallSummary::default();
    for index in 0..plan.send_count {
        let request = build_request(&plan.request_name, &plan.source_service);
        let result = match tokio::time::timeout(plan.call_timeout, caller.call(request)).await {
            Ok(result) => result,
            Err(_) => Err(Status::deadline_exceeded(format!(
                "call did not complete within {:?}",
                plan.call_timeout
            ))),
        };

        summary.attempted += 1;
        match &result {
            Ok(response) => {
                summary.succeeded += 1;
                grpc_info!(
                    "(run_calls) send message, index ({}) resp ({:?}), err(None).",
                    index,
                    response
                );
            }
            Err(status) => {
                summary.failed += 1;
                grpc_warn!(
                    "(run_calls) send message, index ({}) resp (None), err({:?}).",
                    index,
                    status
                );
            }
        }

        tokio::time::sleep(plan.call_delay).await;
    }

    grpc_info!(
        "(run_calls) done, {} succeeded, {} failed.",
        summary.succeeded,
        summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Fails every other call, records what it was sent
    #[derive(Default)]
    struct FlakyCaller {
        requests: Vec<Request<HelloRequest>>,
    }

    #[async_trait]
    impl HelloCaller for FlakyCaller {
        async fn call(&mut self, request: Request<HelloRequest>) -> Result<HelloResponse, Status> {
            let name = request.get_ref().name.clone();
            self.requests.push(request);
            if self.requests.len() % 2 == 0 {
                return Err(Status::unavailable("no instance"));
            }
            Ok(HelloResponse {
                message: format!("hello {name}"),
            })
        }
    }

    /// Never answers
    struct StuckCaller;

    #[async_trait]
    impl HelloCaller for StuckCaller {
        async fn call(&mut self, _request: Request<HelloRequest>) -> Result<HelloResponse, Status> {
            futures::future::pending().await
        }
    }

    fn plan(send_count: usize) -> CallPlan {
        CallPlan {
            send_count,
            call_delay: Duration::ZERO,
            call_timeout: Duration::from_millis(50),
            request_name: String::from("polaris"),
            source_service: SourceService {
                namespace: String::from("default"),
                service: String::from("caller"),
                metadata: BTreeMap::from([(String::from("flag"), String::from("test"))]),
            },
        }
    }

    #[tokio::test]
    async fn test_run_calls_does_not_stop_on_error() {
        let mut caller = FlakyCaller::default();
        let summary = run_calls(&mut caller, &plan(5)).await;

        assert_eq!(
            summary,
            CallSummary {
                attempted: 5,
                succeeded: 3,
                failed: 2
            }
        );
        assert_eq!(caller.requests.len(), 5);
        for request in &caller.requests {
            assert_eq!(request.get_ref().name, "polaris");
            assert_eq!(
                request.metadata().get("x-source-service").unwrap(),
                "caller"
            );
        }
    }

    #[tokio::test]
    async fn test_run_calls_zero_count() {
        let mut caller = FlakyCaller::default();
        let summary = run_calls(&mut caller, &plan(0)).await;
        assert_eq!(summary, CallSummary::default());
        assert!(caller.requests.is_empty());
    }

    #[tokio::test]
    async fn test_run_calls_times_out() {
        let summary = run_calls(&mut StuckCaller, &plan(2)).await;
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 2);
    }
}
