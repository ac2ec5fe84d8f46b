use {
    super::{
        verification::VerifyBidInput,
        Service,
    },
    crate::{
        api::{
            ws::UpdateEvent,
            RestError,
        },
        auction::entities,
        per_metrics::BIDS_TOTAL_METRIC,
    },
    axum_prometheus::metrics,
    time::OffsetDateTime,
};

pub struct HandleBidInput {
    pub bid_create: entities::BidCreate,
}

impl Service {
    /// Accepts or rejects a bid. An accepted bid is stored before the in-memory auction is
    /// updated and broadcast, so a storage failure rejects the bid without side effects.
    #[tracing::instrument(
        skip_all,
        fields(bidder = %input.bid_create.bidder, amount = input.bid_create.amount),
        err(level = tracing::Level::TRACE)
    )]
    pub async fn handle_bid(&self, input: HandleBidInput) -> Result<entities::Auction, RestError> {
        let result = self.handle_bid_inner(input).await;
        let label = match &result {
            Ok(_) => "accepted",
            Err(RestError::AuctionClosed) => "closed",
            Err(RestError::InvalidBid) => "invalid",
            Err(_) => "error",
        };
        metrics::counter!(BIDS_TOTAL_METRIC, &[("result", label.to_string())]).increment(1);
        result
    }

    async fn handle_bid_inner(
        &self,
        input: HandleBidInput,
    ) -> Result<entities::Auction, RestError> {
        // Held until the broadcast is sent: bids are applied and announced in arrival order.
        let mut guard = self.repo.lock_in_memory_auction().await;
        let auction = self.load_or_create_auction(&mut guard).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to load or create the auction");
            RestError::TemporarilyUnavailable
        })?;

        // Bids queued behind a slow save are judged by the time they get the lock.
        Self::verify_bid(VerifyBidInput {
            auction:           &auction,
            bid_create:        &input.bid_create,
            verification_time: OffsetDateTime::now_utc(),
        })?;

        let updated = auction.with_bid(input.bid_create.into());
        self.repo.save_auction(&updated).await.map_err(|e| {
            tracing::error!(error = ?e, auction = ?updated, "Failed to save accepted bid");
            RestError::TemporarilyUnavailable
        })?;
        *guard = Some(updated.clone());

        if let Err(e) = self
            .event_sender
            .send(UpdateEvent::NewBid(updated.clone().into()))
        {
            tracing::warn!(error = ?e, "Failed to broadcast new bid");
        }
        tracing::info!(auction = ?updated, "Bid accepted");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::{
            repository::MockDatabase,
            service::tests::get_auction_defaults,
        },
        anyhow::anyhow,
        futures::future::join_all,
        std::time::Duration as StdDuration,
        time::Duration,
        tokio::sync::broadcast::{
            error::TryRecvError,
            Receiver,
        },
    };

    fn get_open_defaults() -> entities::AuctionDefaults {
        entities::AuctionDefaults {
            closes_at: OffsetDateTime::now_utc() + Duration::hours(1),
            ..get_auction_defaults()
        }
    }

    fn get_stored_auction() -> entities::Auction {
        entities::Auction::new(get_open_defaults(), OffsetDateTime::now_utc())
    }

    fn get_db(stored: entities::Auction) -> MockDatabase {
        let mut db = MockDatabase::default();
        db.expect_get_active_auction()
            .times(1)
            .returning(move || Ok(Some(stored.clone())));
        db
    }

    fn bid(amount: f64, bidder: &str) -> HandleBidInput {
        HandleBidInput {
            bid_create: entities::BidCreate {
                amount,
                bidder: bidder.to_string(),
            },
        }
    }

    fn expect_no_event(receiver: &mut Receiver<UpdateEvent>) {
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_handle_bid_accepted_is_saved_and_broadcast_once() {
        let mut db = get_db(get_stored_auction());
        db.expect_update_auction()
            .withf(|auction| {
                auction.current_bid
                    == Some(entities::Bid {
                        amount: 100.0,
                        bidder: "A".to_string(),
                    })
            })
            .times(1)
            .returning(|_| Ok(()));
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        let auction = service.handle_bid(bid(100.0, "A")).await.unwrap();
        assert_eq!(auction.current_bid_amount(), 100.0);

        match receiver.try_recv().unwrap() {
            UpdateEvent::NewBid(update) => {
                assert_eq!(update.current_bid, 100.0);
                assert_eq!(update.last_bidder, Some("A".to_string()));
                assert_eq!(update.minimum_bid, 100.0);
            }
        }
        expect_no_event(&mut receiver);
        assert_eq!(service.get_or_create_auction().await.unwrap(), auction);
    }

    #[tokio::test]
    async fn test_handle_bid_below_current_bid_is_rejected_without_side_effects() {
        let stored = get_stored_auction().with_bid(entities::Bid {
            amount: 100.0,
            bidder: "A".to_string(),
        });
        let mut db = get_db(stored.clone());
        db.expect_update_auction().never();
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        assert_eq!(
            service.handle_bid(bid(50.0, "B")).await.unwrap_err(),
            RestError::InvalidBid
        );
        expect_no_event(&mut receiver);
        assert_eq!(service.get_or_create_auction().await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_handle_bid_equal_to_current_bid_is_rejected() {
        let stored = get_stored_auction().with_bid(entities::Bid {
            amount: 100.0,
            bidder: "A".to_string(),
        });
        let mut db = get_db(stored.clone());
        db.expect_update_auction().never();
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        assert_eq!(
            service.handle_bid(bid(100.0, "B")).await.unwrap_err(),
            RestError::InvalidBid
        );
        expect_no_event(&mut receiver);
        assert_eq!(service.get_or_create_auction().await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_handle_bid_after_closing_is_rejected() {
        // Closes in 2024.
        let stored = entities::Auction::new(get_auction_defaults(), OffsetDateTime::now_utc());
        let mut db = get_db(stored.clone());
        db.expect_update_auction().never();
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        assert_eq!(
            service.handle_bid(bid(9999.0, "C")).await.unwrap_err(),
            RestError::AuctionClosed
        );
        expect_no_event(&mut receiver);
        assert_eq!(service.get_or_create_auction().await.unwrap(), stored);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handle_bid_waiting_for_slow_save_past_closing_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let stored = entities::Auction::new(
            entities::AuctionDefaults {
                closes_at: now + Duration::milliseconds(300),
                ..get_auction_defaults()
            },
            now,
        );
        let mut db = get_db(stored.clone());
        db.expect_update_auction().times(1).returning(|_| {
            std::thread::sleep(StdDuration::from_millis(600));
            Ok(())
        });
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.handle_bid(bid(150.0, "A")).await }
        });
        // The first bid holds the auction lock while it is being saved.
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let second = service.handle_bid(bid(200.0, "B")).await;

        assert!(first.await.unwrap().is_ok());
        assert_eq!(second.unwrap_err(), RestError::AuctionClosed);
        match receiver.try_recv().unwrap() {
            UpdateEvent::NewBid(update) => {
                assert_eq!(update.current_bid, 150.0);
                assert_eq!(update.last_bidder, Some("A".to_string()));
            }
        }
        expect_no_event(&mut receiver);
        assert_eq!(
            service
                .get_or_create_auction()
                .await
                .unwrap()
                .current_bid_amount(),
            150.0
        );
    }

    #[tokio::test]
    async fn test_handle_bid_save_failure_keeps_state_and_does_not_broadcast() {
        let stored = get_stored_auction();
        let mut db = get_db(stored.clone());
        db.expect_update_auction()
            .times(1)
            .returning(|_| Err(anyhow!("connection reset")));
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        assert_eq!(
            service.handle_bid(bid(150.0, "A")).await.unwrap_err(),
            RestError::TemporarilyUnavailable
        );
        expect_no_event(&mut receiver);
        assert_eq!(service.get_or_create_auction().await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_handle_bid_sequence_accepts_only_increasing_amounts() {
        let mut db = get_db(get_stored_auction());
        db.expect_update_auction().times(3).returning(|_| Ok(()));
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        for (amount, bidder) in [
            (100.0, "A"),
            (150.0, "B"),
            (120.0, "A"),
            (150.0, "A"),
            (99.0, "C"),
            (200.0, "C"),
        ] {
            let _ = service.handle_bid(bid(amount, bidder)).await;
        }

        let mut accepted = vec![];
        while let Ok(UpdateEvent::NewBid(update)) = receiver.try_recv() {
            accepted.push((update.current_bid, update.last_bidder.unwrap()));
        }
        assert_eq!(
            accepted,
            vec![
                (100.0, "A".to_string()),
                (150.0, "B".to_string()),
                (200.0, "C".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_handle_bid_concurrent_bids_are_broadcast_in_increasing_order() {
        let mut db = get_db(get_stored_auction());
        db.expect_update_auction().returning(|_| Ok(()));
        let (service, mut receiver) = Service::new_with_mocks(db, get_auction_defaults());

        let amounts = [130.0, 110.0, 190.0, 100.0, 170.0, 150.0, 120.0, 180.0, 160.0, 140.0];
        let handles = amounts.iter().map(|amount| {
            let service = service.clone();
            let input = bid(*amount, &format!("bidder-{amount}"));
            tokio::spawn(async move { service.handle_bid(input).await })
        });
        let results = join_all(handles).await;
        let accepted_count = results
            .into_iter()
            .filter(|result| matches!(result, Ok(Ok(_))))
            .count();

        let mut broadcast = vec![];
        while let Ok(UpdateEvent::NewBid(update)) = receiver.try_recv() {
            broadcast.push(update.current_bid);
        }
        assert_eq!(broadcast.len(), accepted_count);
        assert!(broadcast.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(broadcast.last(), Some(&190.0));
        assert_eq!(
            service
                .get_or_create_auction()
                .await
                .unwrap()
                .current_bid_amount(),
            190.0
        );
    }
}
