use {
    serde::{
        Deserialize,
        Serialize,
    },
    strum::AsRefStr,
    utoipa::{
        ToResponse,
        ToSchema,
    },
};

pub mod auction;
pub mod ws;

/// Amount of a bid, in the auction's currency unit.
pub type BidAmount = f64;
/// Caller-supplied label identifying a bidder. It is never verified.
pub type BidderId = String;

#[derive(ToResponse, ToSchema, Serialize, Deserialize, Debug)]
#[response(description = "An error occurred processing the request")]
pub struct ErrorBodyResponse {
    pub error: String,
}

#[derive(AsRefStr, Clone, Copy)]
#[strum(prefix = "/")]
pub enum Route {
    #[strum(serialize = "v1")]
    V1,
    #[strum(serialize = "")]
    Root,
    #[strum(serialize = "live")]
    Liveness,
    #[strum(serialize = "docs/openapi.json")]
    OpenApi,
}

/// Routes served under the versioned api prefix.
pub trait Routable: AsRef<str> + Clone {
    fn full_path(&self) -> String {
        format!("{}{}", Route::V1.as_ref(), self.as_ref())
            .trim_end_matches('/')
            .to_string()
    }
}
