use {
    crate::{
        auction::{
            Auction,
            BidCreate,
        },
        Routable,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    strum::AsRefStr,
    utoipa::ToSchema,
};

/// Frames sent by clients. Every frame is `{"event": ..., "data": ...}`.
#[derive(Deserialize, Clone, ToSchema, Serialize, Debug, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "fazerLance")]
    PlaceBid(BidCreate),
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct Notice {
    #[serde(rename = "mensagem")]
    pub message: String,
}

/// Frames sent by the server. Only `novoLance` is broadcast, every other
/// event is addressed to a single connection.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Sent once, right after the connection is established.
    #[serde(rename = "estadoAtual")]
    CurrentState(Auction),
    #[serde(rename = "novoLance")]
    NewBid(Auction),
    #[serde(rename = "lanceInvalido")]
    InvalidBid(Notice),
    #[serde(rename = "leilaoEncerrado")]
    AuctionClosed(Notice),
    /// The frame could not be parsed or the bid could not be processed.
    #[serde(rename = "erro")]
    Error(Notice),
}

#[derive(AsRefStr, Clone)]
#[strum(prefix = "/")]
pub enum Route {
    #[strum(serialize = "ws")]
    Ws,
}

impl Routable for Route {}
