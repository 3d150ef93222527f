//! Main function resolving the target and running the call loop.

use dotenv::dotenv;
use hello_client_grpc::prelude::HelloClient;
use log::{error, info};
use polaris_rpc_client::discovery::{PolarisDiscover, ServiceRouter};
use polaris_rpc_client::grpc::run_calls;
use polaris_rpc_client::resolver::PolarisResolver;
use polaris_rpc_client::{call_plan, logger, resolver_conf, Cli, Config, Parser};
use tokio_util::sync::CancellationToken;

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Will use default config settings if no environment vars are found.
    let config = Config::try_from_env().unwrap_or_default();

    // Start Logger
    if let Err(e) = logger::init_logger(&config.log_config) {
        eprintln!("(logger) could not start logger: {}.", e);
    }

    // Exits with a usage message on invalid arguments
    let cli = Cli::parse();
    info!(
        "(main) {}/{} calling {} {} times.",
        cli.namespace,
        cli.service,
        cli.target.dial_uri(),
        cli.send_count
    );

    let discover = PolarisDiscover::new(config.polaris_addresses(), config.polaris_connect_timeout());
    let router = ServiceRouter::new(cli.metadata(), config.enable_recover_all);
    info!("(main) service router chain {:?}.", router.chain());
    let resolver = PolarisResolver::new(discover, router, resolver_conf(&cli, &config));

    let token = CancellationToken::new();
    let (channel, sync) = match resolver.dial(&cli.target, token.clone()).await {
        Ok(dialed) => dialed,
        Err(e) => {
            error!("(main) could not dial {}: {}.", cli.target.dial_uri(), e);
            panic!("{}", e);
        }
    };

    let mut client = HelloClient::new(channel);
    let plan = call_plan(&cli, &config, resolver.conf());
    let summary = run_calls(&mut client, &plan).await;

    token.cancel();
    let _ = sync.await;

    info!(
        "(main) {} calls sent, {} succeeded, {} failed.",
        summary.attempted, summary.succeeded, summary.failed
    );
    Ok(())
}
