use {
    super::Repository,
    crate::auction::entities,
};

impl Repository {
    pub async fn load_active_auction(&self) -> anyhow::Result<Option<entities::Auction>> {
        self.db.get_active_auction().await
    }
}
