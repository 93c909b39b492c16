use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use strongbox_server::{server::GatewayServer, AppContext, Config, ServerArgs};

fn main() -> ExitCode {
    let args = ServerArgs::parse();
    strongbox_server::setup_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn run(args: ServerArgs) -> anyhow::Result<()> {
    let config = Config::load(&args)?;
    let ctx = Arc::new(AppContext::build(config)?);

    let gateway = GatewayServer::start(Arc::clone(&ctx)).await?;
    tracing::info!(addr = %gateway.addr, "strongbox-server ready");

    let sweepers = strongbox_server::lifecycle::spawn_sweepers(Arc::clone(&ctx));

    strongbox_server::lifecycle::wait_for_shutdown_signal().await;
    strongbox_server::lifecycle::run_cleanup_once("signal");

    for sweeper in sweepers {
        sweeper.abort();
    }
    gateway.stop().await;
    Ok(())
}
