use {
    super::entities,
    tokio::sync::{
        Mutex,
        MutexGuard,
    },
};

mod create_auction;
mod load_active_auction;
mod lock_in_memory_auction;
mod models;
mod save_auction;

pub use models::*;

/// Exclusive access to the in-memory auction. `None` until the auction is loaded or created.
pub type AuctionGuard<'a> = MutexGuard<'a, Option<entities::Auction>>;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    pub auction: Mutex<Option<entities::Auction>>,
}

#[derive(Debug)]
pub struct Repository {
    pub in_memory_store: InMemoryStore,
    pub db:              Box<dyn Database>,
}

impl Repository {
    pub fn new(db: impl Database) -> Self {
        Self {
            in_memory_store: InMemoryStore::default(),
            db:              Box::new(db),
        }
    }
}
