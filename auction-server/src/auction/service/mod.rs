use {
    super::{
        entities,
        repository::{
            Database,
            Repository,
        },
    },
    crate::api::ws::UpdateEvent,
    std::sync::Arc,
    tokio::sync::broadcast,
};

pub mod get_or_create_auction;
pub mod handle_bid;
pub mod verification;

pub struct Config {
    /// Used to create the auction when none is stored.
    pub auction_defaults: entities::AuctionDefaults,
}

pub struct ServiceInner {
    config:       Config,
    repo:         Arc<Repository>,
    event_sender: broadcast::Sender<UpdateEvent>,
}

/// Coordinates the auction: the only writer of the auction state.
#[derive(Clone)]
pub struct Service(Arc<ServiceInner>);
impl std::ops::Deref for Service {
    type Target = ServiceInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Service {
    pub fn new(
        db: impl Database,
        config: Config,
        event_sender: broadcast::Sender<UpdateEvent>,
    ) -> Self {
        Self(Arc::new(ServiceInner {
            config,
            repo: Arc::new(Repository::new(db)),
            event_sender,
        }))
    }
}
