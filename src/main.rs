use std::{net::SocketAddr, sync::Arc};

use skywave::{
    common::{http::HttpClient, logger, types::AnyResult},
    configs::Config,
    log_println,
    server::AppState,
    telemetry::{OpenSkyClient, TelemetryFeed},
    transport,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config);

    log_println!(
        "skywave {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    );

    let telemetry = if config.telemetry.enabled {
        let client = Arc::new(HttpClient::new()?);
        let endpoint = config.telemetry.endpoint.clone();
        Some(Arc::new(TelemetryFeed::new(
            OpenSkyClient::new(client, endpoint),
            config.telemetry.clone(),
        )))
    } else {
        info!("telemetry disabled");
        None
    };

    let state = Arc::new(AppState::new(config, telemetry));
    if let Some(feed) = &state.telemetry {
        feed.clone().spawn(state.shutdown.clone());
    }

    info!("relay command: {}", state.topology.command_line());

    let server = &state.config.server;
    let address: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("skywave listening on {}", address);

    let app = transport::router(state.clone());
    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("shutdown requested, ending open streams");
            shutdown.cancel();
        })
        .await?;

    // Bodies ended on cancel; their transcoders are reaped in the background.
    if !state.active_streams.wait_until_idle(state.shutdown_grace()).await {
        warn!(
            "{} transcoder(s) still running at exit",
            state.active_streams.count()
        );
    }

    info!("bye");
    Ok(())
}
