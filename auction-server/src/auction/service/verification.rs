use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
    time::OffsetDateTime,
};

pub struct VerifyBidInput<'a> {
    pub auction:           &'a entities::Auction,
    pub bid_create:        &'a entities::BidCreate,
    /// Must be read while holding the auction lock, after every earlier bid was applied.
    pub verification_time: OffsetDateTime,
}

impl Service {
    /// Checks the bid against the auction state at `verification_time`.
    pub fn verify_bid(input: VerifyBidInput) -> Result<(), RestError> {
        let VerifyBidInput {
            auction,
            bid_create,
            verification_time,
        } = input;
        if auction.is_closed(verification_time) {
            return Err(RestError::AuctionClosed);
        }

        // The minimum bid is inclusive, the current bid must be exceeded.
        // Written as a negation so that a NaN amount is rejected too.
        let amount = bid_create.amount;
        if !(amount >= auction.minimum_bid && amount > auction.current_bid_amount()) {
            return Err(RestError::InvalidBid);
        }
        Ok(())
    }
}
