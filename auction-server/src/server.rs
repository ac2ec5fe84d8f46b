use {
    crate::{
        api::{
            self,
            ws::WsState,
        },
        auction::service::{
            Config as AuctionServiceConfig,
            Service as AuctionService,
        },
        config::{
            Config,
            MigrateOptions,
            RunOptions,
        },
        kernel::db,
        per_metrics,
        state::ServerState,
    },
    anyhow::anyhow,
    axum_prometheus::metrics_exporter_prometheus::PrometheusBuilder,
    futures::future::join_all,
    std::{
        sync::{
            atomic::{
                AtomicBool,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
};

const NOTIFICATIONS_CHAN_LEN: usize = 1000;

pub async fn start_server(run_options: RunOptions) -> anyhow::Result<()> {
    tokio::spawn(async move {
        tracing::info!("Registered shutdown signal handler...");
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to listen for the shutdown signal");
        }
        tracing::info!("Shut down signal received, waiting for tasks...");
        SHOULD_EXIT.store(true, Ordering::Release);
    });

    let config = match &run_options.config.config {
        Some(path) => Config::load(path).map_err(|err| {
            anyhow!(
                "Failed to load config from file({path}): {:?}",
                err,
                path = path
            )
        })?,
        None => Config::default(),
    };
    tracing::info!(auction = ?config.auction, "Using auction defaults");

    let pool = db::connect(&run_options.server.database_url).await?;
    let metrics_recorder = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| anyhow!("Failed to install metrics recorder: {:?}", err))?;

    let ws = WsState::new(
        run_options.server.requester_ip_header_name.clone(),
        NOTIFICATIONS_CHAN_LEN,
    );
    let auction_service = AuctionService::new(
        pool,
        AuctionServiceConfig {
            auction_defaults: config.auction.into(),
        },
        ws.broadcast_sender.clone(),
    );
    let server_state = Arc::new(ServerState {
        ws,
        auction_service,
        metrics_recorder,
    });

    let server_loop = tokio::spawn(api::start_api(run_options.clone(), server_state.clone()));
    let metrics_loop = tokio::spawn(per_metrics::start_metrics(run_options, server_state));
    for result in join_all(vec![server_loop, metrics_loop]).await {
        result??;
    }
    Ok(())
}

pub async fn run_migrations(migrate_options: MigrateOptions) -> anyhow::Result<()> {
    let pool = db::connect(&migrate_options.database_url).await?;
    db::migrate(&pool).await?;
    tracing::info!("Migrations applied");
    Ok(())
}

// A static exit flag to indicate to running threads that we're shutting down. This is used to
// gracefully shutdown the application.
//
// NOTE: A more idiomatic approach would be to use a tokio::sync::broadcast channel, and to send a
// shutdown signal to all running tasks. However, this is a bit more complicated to implement and
// we don't rely on global state for anything else.
pub(crate) static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);
pub const EXIT_CHECK_INTERVAL: Duration = Duration::from_secs(1);
