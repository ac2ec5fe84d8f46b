use {
    crate::{
        BidAmount,
        BidderId,
        Routable,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    strum::AsRefStr,
    time::OffsetDateTime,
    utoipa::{
        ToResponse,
        ToSchema,
    },
};

/// State of the auction as seen by clients.
#[derive(Serialize, Deserialize, ToSchema, ToResponse, Clone, Debug, PartialEq)]
pub struct Auction {
    /// The item being auctioned.
    #[schema(example = "Produto Exemplo")]
    pub item:        String,
    /// Every bid must be at least this amount.
    #[serde(rename = "lanceMinimo")]
    #[schema(example = 100.0)]
    pub minimum_bid: BidAmount,
    /// The highest accepted bid so far, 0 if no bid was accepted yet.
    #[serde(rename = "lanceAtual")]
    #[schema(example = 150.0)]
    pub current_bid: BidAmount,
    /// The bidder of the highest accepted bid, null if no bid was accepted yet.
    #[serde(rename = "ultimoLicitante")]
    #[schema(example = "maria", value_type = Option<String>)]
    pub last_bidder: Option<BidderId>,
    /// Bids are accepted strictly before this time.
    #[serde(rename = "dataFinal", with = "time::serde::rfc3339")]
    #[schema(example = "2024-09-02T23:59:59-03:00", value_type = String)]
    pub closes_at:   OffsetDateTime,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct BidCreate {
    /// Amount offered.
    #[serde(rename = "valor")]
    #[schema(example = 150.0)]
    pub amount: BidAmount,
    /// Label of the bidder placing the bid.
    #[serde(rename = "usuario")]
    #[schema(example = "maria", value_type = String)]
    pub bidder: BidderId,
}

#[derive(AsRefStr, Clone)]
#[strum(prefix = "/")]
pub enum Route {
    #[strum(serialize = "auction")]
    GetAuction,
}

impl Routable for Route {}
