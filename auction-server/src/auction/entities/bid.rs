use {
    auction_api_types::{
        auction as api,
        BidAmount,
        BidderId,
    },
};

/// A bid submitted by a connection, not validated yet.
#[derive(Clone, Debug, PartialEq)]
pub struct BidCreate {
    pub amount: BidAmount,
    pub bidder: BidderId,
}

impl From<api::BidCreate> for BidCreate {
    fn from(bid: api::BidCreate) -> Self {
        Self {
            amount: bid.amount,
            bidder: bid.bidder,
        }
    }
}

/// An accepted bid. The amount and the bidder only exist together.
#[derive(Clone, Debug, PartialEq)]
pub struct Bid {
    pub amount: BidAmount,
    pub bidder: BidderId,
}

impl From<BidCreate> for Bid {
    fn from(bid: BidCreate) -> Self {
        Self {
            amount: bid.amount,
            bidder: bid.bidder,
        }
    }
}
