use {
    crate::{
        auction,
        config::RunOptions,
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::ServerState,
    },
    anyhow::Result,
    auction_api_types::{
        auction::{
            Auction,
            BidCreate,
            Route as AuctionRoute,
        },
        ws::{
            ClientMessage,
            Notice,
            Route as WsRoute,
            ServerMessage,
        },
        ErrorBodyResponse,
        Routable,
        Route,
    },
    axum::{
        http::StatusCode,
        response::{
            IntoResponse,
            Response,
        },
        routing::get,
        Json,
        Router,
    },
    axum_prometheus::PrometheusMetricLayerBuilder,
    clap::crate_version,
    std::{
        fmt::{
            Display,
            Formatter,
        },
        path::Path,
        sync::{
            atomic::Ordering,
            Arc,
        },
    },
    tower_http::{
        cors::CorsLayer,
        services::ServeDir,
    },
    utoipa::OpenApi,
    utoipa_redoc::{
        Redoc,
        Servable,
    },
};

pub mod ws;

async fn root() -> String {
    format!("Live Auction Server API {}", crate_version!())
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestError {
    /// The request contained invalid parameters
    BadParameters(String),
    /// The bid is below the minimum bid or does not exceed the current bid
    InvalidBid,
    /// The bid was submitted at or after the closing time of the auction
    AuctionClosed,
    /// The requester has too many open websocket connections
    TooManyOpenWebsocketConnections,
    /// Internal error occurred during processing the request
    TemporarilyUnavailable,
}

impl RestError {
    pub fn to_status_and_message(&self) -> (StatusCode, String) {
        match self {
            RestError::BadParameters(msg) => {
                (StatusCode::BAD_REQUEST, format!("Bad parameters: {}", msg))
            }
            RestError::InvalidBid => (
                StatusCode::BAD_REQUEST,
                "Lance inválido. O lance deve ser maior que o lance atual e o lance mínimo."
                    .to_string(),
            ),
            RestError::AuctionClosed => (
                StatusCode::CONFLICT,
                "O leilão já foi encerrado. Não são permitidos novos lances.".to_string(),
            ),
            RestError::TooManyOpenWebsocketConnections => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many open websocket connections".to_string(),
            ),
            RestError::TemporarilyUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "This service is temporarily unavailable".to_string(),
            ),
        }
    }
}

impl Display for RestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_status_and_message().1)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, msg) = self.to_status_and_message();
        (status, Json(ErrorBodyResponse { error: msg })).into_response()
    }
}

pub async fn live() -> Response {
    (StatusCode::OK, "OK").into_response()
}

// Make sure functions included in the paths section have distinct names, otherwise some api generators will fail
#[derive(OpenApi)]
#[openapi(
    paths(auction::api::get_auction),
    components(
        schemas(
            Auction,
            BidCreate,
            ClientMessage,
            ServerMessage,
            Notice,
            ErrorBodyResponse,
        ),
        responses(ErrorBodyResponse, Auction),
    ),
    tags(
        (name = "Live Auction Server", description = "Runs a single auction. Clients follow the auction \
        and place bids over the websocket api at /v1/ws.")
    )
)]
struct ApiDoc;

pub fn create_router(store: Arc<ServerState>, static_dir: Option<&Path>) -> Router {
    let (prometheus_layer, _) = PrometheusMetricLayerBuilder::new()
        .with_metrics_from_fn(|| store.metrics_recorder.clone())
        .build_pair();

    let v1_routes = Router::new()
        .route(&AuctionRoute::GetAuction.full_path(), get(auction::api::get_auction))
        .route(&WsRoute::Ws.full_path(), get(ws::ws_route_handler));

    let app = Router::new()
        .merge(Redoc::with_url("/docs", ApiDoc::openapi()))
        .route(
            Route::OpenApi.as_ref(),
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(v1_routes)
        .route(Route::Root.as_ref(), get(root))
        .route(Route::Liveness.as_ref(), get(live));

    // The browser client is served from here, the api routes above take precedence.
    let app = match static_dir {
        Some(static_dir) => app.fallback_service(ServeDir::new(static_dir)),
        None => app,
    };

    app.layer(CorsLayer::permissive())
        .layer(prometheus_layer)
        .with_state(store)
}

pub async fn start_api(run_options: RunOptions, store: Arc<ServerState>) -> Result<()> {
    let app = create_router(store, run_options.server.static_dir.as_deref());

    tracing::info!(listen_addr = %run_options.server.listen_addr, "Starting RPC server...");
    let listener = tokio::net::TcpListener::bind(&run_options.server.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            while !SHOULD_EXIT.load(Ordering::Acquire) {
                tokio::time::sleep(EXIT_CHECK_INTERVAL).await;
            }
            tracing::info!("Shutting down RPC server...");
        })
        .await?;
    Ok(())
}
