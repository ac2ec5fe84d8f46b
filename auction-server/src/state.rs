use {
    crate::{
        api::ws::WsState,
        auction::service::Service as AuctionService,
    },
    axum_prometheus::metrics_exporter_prometheus::PrometheusHandle,
};

pub struct ServerState {
    pub ws:               WsState,
    pub auction_service:  AuctionService,
    pub metrics_recorder: PrometheusHandle,
}
