use {
    super::bid::Bid,
    auction_api_types::{
        auction as api,
        BidAmount,
    },
    time::OffsetDateTime,
};

/// Key of the only auction the server manages.
pub const ACTIVE_AUCTION_KEY: &str = "active";

/// Values used to create the auction when none is stored yet.
#[derive(Clone, Debug, PartialEq)]
pub struct AuctionDefaults {
    pub item:        String,
    pub minimum_bid: BidAmount,
    pub closes_at:   OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Auction {
    pub item:          String,
    pub minimum_bid:   BidAmount,
    /// Highest accepted bid, `None` until the first bid is accepted.
    pub current_bid:   Option<Bid>,
    pub closes_at:     OffsetDateTime,
    pub creation_time: OffsetDateTime,
}

impl Auction {
    pub fn new(defaults: AuctionDefaults, creation_time: OffsetDateTime) -> Self {
        Self {
            item: defaults.item,
            minimum_bid: defaults.minimum_bid,
            current_bid: None,
            closes_at: defaults.closes_at,
            creation_time,
        }
    }

    pub fn is_closed(&self, time: OffsetDateTime) -> bool {
        time >= self.closes_at
    }

    /// The amount a new bid has to exceed. Zero while no bid was accepted.
    pub fn current_bid_amount(&self) -> BidAmount {
        self.current_bid.as_ref().map_or(0.0, |bid| bid.amount)
    }

    /// Returns the auction with `bid` as the highest bid. Callers must verify the bid first.
    pub fn with_bid(&self, bid: Bid) -> Self {
        Self {
            current_bid: Some(bid),
            ..self.clone()
        }
    }
}

impl From<Auction> for api::Auction {
    fn from(auction: Auction) -> Self {
        let current_bid = auction.current_bid_amount();
        Self {
            item: auction.item,
            minimum_bid: auction.minimum_bid,
            current_bid,
            last_bidder: auction.current_bid.map(|bid| bid.bidder),
            closes_at: auction.closes_at,
        }
    }
}
