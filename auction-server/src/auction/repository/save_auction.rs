use {
    super::Repository,
    crate::auction::entities,
};

impl Repository {
    pub async fn save_auction(&self, auction: &entities::Auction) -> anyhow::Result<()> {
        self.db.update_auction(auction).await
    }
}
