#[cfg(test)]
use mockall::automock;
use {
    super::entities,
    crate::kernel::db::DB,
    anyhow::anyhow,
    axum::async_trait,
    sqlx::FromRow,
    std::fmt::Debug,
    time::{
        OffsetDateTime,
        PrimitiveDateTime,
        UtcOffset,
    },
    tracing::instrument,
};

#[derive(Clone, FromRow, Debug)]
pub struct Auction {
    pub key:           String,
    pub item:          String,
    pub minimum_bid:   f64,
    pub current_bid:   Option<f64>,
    pub last_bidder:   Option<String>,
    pub closes_at:     PrimitiveDateTime,
    pub creation_time: PrimitiveDateTime,
}

impl Auction {
    pub fn get_auction_entity(&self) -> anyhow::Result<entities::Auction> {
        let current_bid = match (self.current_bid, self.last_bidder.clone()) {
            (Some(amount), Some(bidder)) => Some(entities::Bid { amount, bidder }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "Auction {} has a current bid without a bidder or vice versa",
                    self.key
                ))
            }
        };
        Ok(entities::Auction {
            item: self.item.clone(),
            minimum_bid: self.minimum_bid,
            current_bid,
            closes_at: self.closes_at.assume_offset(UtcOffset::UTC),
            creation_time: self.creation_time.assume_offset(UtcOffset::UTC),
        })
    }
}

fn to_primitive_utc(time: OffsetDateTime) -> PrimitiveDateTime {
    let time = time.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(time.date(), time.time())
}

/// Durable storage of the single active auction, keyed by [`entities::ACTIVE_AUCTION_KEY`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Database: Debug + Send + Sync + 'static {
    /// Absence of the auction is `Ok(None)`, not an error.
    async fn get_active_auction(&self) -> anyhow::Result<Option<entities::Auction>>;
    /// Inserts the auction unless one is stored already and returns the stored record.
    async fn add_auction(&self, auction: &entities::Auction) -> anyhow::Result<entities::Auction>;
    /// Overwrites every field of the stored auction.
    async fn update_auction(&self, auction: &entities::Auction) -> anyhow::Result<()>;
}

#[async_trait]
impl Database for DB {
    #[instrument(name = "db_get_active_auction", fields(result = "success"), skip_all)]
    async fn get_active_auction(&self) -> anyhow::Result<Option<entities::Auction>> {
        let auction = sqlx::query_as::<_, Auction>("SELECT * FROM auction WHERE key = $1")
            .bind(entities::ACTIVE_AUCTION_KEY)
            .fetch_optional(self)
            .await
            .inspect_err(|_| {
                tracing::Span::current().record("result", "error");
            })?;
        auction.map(|a| a.get_auction_entity()).transpose()
    }

    #[instrument(name = "db_add_auction", fields(result = "success"), skip_all)]
    async fn add_auction(&self, auction: &entities::Auction) -> anyhow::Result<entities::Auction> {
        sqlx::query(
            "INSERT INTO auction (key, item, minimum_bid, current_bid, last_bidder, closes_at, creation_time) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (key) DO NOTHING",
        )
        .bind(entities::ACTIVE_AUCTION_KEY)
        .bind(&auction.item)
        .bind(auction.minimum_bid)
        .bind(auction.current_bid.as_ref().map(|bid| bid.amount))
        .bind(auction.current_bid.as_ref().map(|bid| bid.bidder.clone()))
        .bind(to_primitive_utc(auction.closes_at))
        .bind(to_primitive_utc(auction.creation_time))
        .execute(self)
        .await
        .inspect_err(|_| {
            tracing::Span::current().record("result", "error");
        })?;

        self.get_active_auction()
            .await?
            .ok_or_else(|| anyhow!("Auction not found right after it was added"))
    }

    #[instrument(name = "db_update_auction", fields(result = "success"), skip_all)]
    async fn update_auction(&self, auction: &entities::Auction) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE auction SET item = $2, minimum_bid = $3, current_bid = $4, last_bidder = $5, closes_at = $6 WHERE key = $1",
        )
        .bind(entities::ACTIVE_AUCTION_KEY)
        .bind(&auction.item)
        .bind(auction.minimum_bid)
        .bind(auction.current_bid.as_ref().map(|bid| bid.amount))
        .bind(auction.current_bid.as_ref().map(|bid| bid.bidder.clone()))
        .bind(to_primitive_utc(auction.closes_at))
        .execute(self)
        .await
        .inspect_err(|_| {
            tracing::Span::current().record("result", "error");
        })?;

        if result.rows_affected() == 0 {
            tracing::Span::current().record("result", "error");
            return Err(anyhow!(
                "Auction {} not found while saving",
                entities::ACTIVE_AUCTION_KEY
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        time::macros::datetime,
    };

    fn get_model() -> Auction {
        Auction {
            key:           entities::ACTIVE_AUCTION_KEY.to_string(),
            item:          "Produto Exemplo".to_string(),
            minimum_bid:   100.0,
            current_bid:   Some(120.0),
            last_bidder:   Some("A".to_string()),
            closes_at:     datetime!(2024-09-03 02:59:59),
            creation_time: datetime!(2024-09-01 12:00:00),
        }
    }

    #[test]
    fn test_get_auction_entity() {
        let auction = get_model().get_auction_entity().unwrap();
        assert_eq!(
            auction.current_bid,
            Some(entities::Bid {
                amount: 120.0,
                bidder: "A".to_string(),
            })
        );
        assert_eq!(auction.closes_at, datetime!(2024-09-02 23:59:59 -3));
    }

    #[test]
    fn test_get_auction_entity_without_bidder_fails() {
        let model = Auction {
            last_bidder: None,
            ..get_model()
        };
        assert!(model.get_auction_entity().is_err());
    }

    #[test]
    fn test_to_primitive_utc_converts_offset() {
        assert_eq!(
            to_primitive_utc(datetime!(2024-09-02 23:59:59 -3)),
            datetime!(2024-09-03 02:59:59)
        );
    }
}
