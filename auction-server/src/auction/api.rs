use {
    crate::{
        api::RestError,
        state::ServerState,
    },
    auction_api_types::{
        auction::Auction,
        ErrorBodyResponse,
    },
    axum::{
        extract::State,
        Json,
    },
    std::sync::Arc,
};

/// Returns the current state of the auction.
///
/// The auction is created with the configured default values if it does not exist yet.
/// Bids are placed through the websocket api.
#[utoipa::path(get, path = "/v1/auction", responses(
    (status = 200, description = "Current state of the auction", body = Auction),
    (status = 503, response = ErrorBodyResponse),
),)]
pub async fn get_auction(
    State(store): State<Arc<ServerState>>,
) -> Result<Json<Auction>, RestError> {
    let auction = store.auction_service.get_or_create_auction().await?;
    Ok(Json(auction.into()))
}
