use super::{
    AuctionGuard,
    Repository,
};

impl Repository {
    /// Every read-modify-write of the auction happens while holding this guard.
    pub async fn lock_in_memory_auction(&self) -> AuctionGuard<'_> {
        self.in_memory_store.auction.lock().await
    }
}
