use {
    super::Service,
    crate::{
        api::RestError,
        auction::{
            entities,
            repository::AuctionGuard,
        },
    },
};

impl Service {
    /// Fills the in-memory auction on first use, from the database or, if nothing is stored,
    /// by creating a new auction from the configured defaults.
    pub(super) async fn load_or_create_auction(
        &self,
        auction: &mut AuctionGuard<'_>,
    ) -> anyhow::Result<entities::Auction> {
        if let Some(current) = &**auction {
            return Ok(current.clone());
        }

        let loaded = match self.repo.load_active_auction().await? {
            Some(loaded) => {
                tracing::info!(auction = ?loaded, "Loaded stored auction");
                loaded
            }
            None => {
                let created = self
                    .repo
                    .create_auction(self.config.auction_defaults.clone())
                    .await?;
                tracing::info!(auction = ?created, "Created auction with default values");
                created
            }
        };
        **auction = Some(loaded.clone());
        Ok(loaded)
    }

    #[tracing::instrument(skip_all, err(level = tracing::Level::TRACE))]
    pub async fn get_or_create_auction(&self) -> Result<entities::Auction, RestError> {
        let mut auction = self.repo.lock_in_memory_auction().await;
        self.load_or_create_auction(&mut auction)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to load or create the auction");
                RestError::TemporarilyUnavailable
            })
    }
}
