use {
    super::Repository,
    crate::auction::entities,
    time::OffsetDateTime,
};

impl Repository {
    /// Stores a new auction built from `defaults` and returns the stored record.
    /// If another writer stored the auction first, its record is returned instead.
    #[tracing::instrument(skip_all, fields(item = %defaults.item))]
    pub async fn create_auction(
        &self,
        defaults: entities::AuctionDefaults,
    ) -> anyhow::Result<entities::Auction> {
        let auction = entities::Auction::new(defaults, OffsetDateTime::now_utc());
        self.db.add_auction(&auction).await
    }
}
