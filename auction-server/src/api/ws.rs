use {
    super::RestError,
    crate::{
        auction::service::handle_bid::HandleBidInput,
        per_metrics::WEBSOCKET_CONNECTIONS_METRIC,
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::ServerState,
    },
    anyhow::{
        anyhow,
        Result,
    },
    auction_api_types::{
        auction::{
            Auction,
            BidCreate,
        },
        ws::{
            ClientMessage,
            Notice,
            ServerMessage,
        },
    },
    axum::{
        extract::{
            ws::{
                Message,
                WebSocket,
            },
            State,
            WebSocketUpgrade,
        },
        http::HeaderMap,
        response::IntoResponse,
    },
    axum_prometheus::metrics,
    dashmap::DashMap,
    futures::{
        stream::{
            SplitSink,
            SplitStream,
        },
        SinkExt,
        StreamExt,
    },
    std::{
        collections::HashSet,
        net::IpAddr,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
    tokio::sync::broadcast,
    tracing::instrument,
};

pub struct WsState {
    pub requester_ip_header_name: String,
    subscriber_counter:           AtomicUsize,
    subscriber_per_ip:            DashMap<IpAddr, HashSet<SubscriberId>>,
    pub broadcast_sender:         broadcast::Sender<UpdateEvent>,
    pub broadcast_receiver:       broadcast::Receiver<UpdateEvent>,
}

const MAXIMUM_SUBSCRIBERS_PER_IP: usize = 10;

impl WsState {
    pub fn new(requester_ip_header_name: String, broadcast_channel_size: usize) -> Self {
        let (broadcast_sender, broadcast_receiver) = broadcast::channel(broadcast_channel_size);
        Self {
            requester_ip_header_name,
            subscriber_counter: AtomicUsize::new(0),
            subscriber_per_ip: DashMap::new(),
            broadcast_sender,
            broadcast_receiver,
        }
    }

    /// If the specified IP address has too many open websocket connections, this function will
    /// return none. Otherwise, it will return the new subscriber id.
    pub fn get_new_subscriber_id(&self, ip: Option<IpAddr>) -> Option<SubscriberId> {
        let id = self.subscriber_counter.fetch_add(1, Ordering::SeqCst);
        if let Some(ip) = ip {
            let mut ids = self.subscriber_per_ip.entry(ip).or_default();
            if ids.len() >= MAXIMUM_SUBSCRIBERS_PER_IP {
                return None;
            }
            ids.insert(id);
        }
        Some(id)
    }

    pub fn remove_subscriber(&self, id: SubscriberId, ip: Option<IpAddr>) {
        if let Some(ip) = ip {
            if let Some(mut ids) = self.subscriber_per_ip.get_mut(&ip) {
                ids.remove(&id);
            }
            self.subscriber_per_ip.remove_if(&ip, |_, ids| ids.is_empty());
        }
    }
}

pub async fn ws_route_handler(
    ws: WebSocketUpgrade,
    State(store): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let requester_ip = headers
        .get(store.ws.requester_ip_header_name.as_str())
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next()) // Only take the first ip if there are multiple
        .and_then(|value| value.trim().parse().ok());

    if requester_ip.is_none() {
        tracing::debug!("Failed to get requester IP address");
    }

    match store.ws.get_new_subscriber_id(requester_ip) {
        Some(subscriber_id) => ws
            .on_failed_upgrade(release_on_failed_upgrade(
                store.clone(),
                subscriber_id,
                requester_ip,
            ))
            .on_upgrade(move |socket| {
                websocket_handler(socket, store, subscriber_id, requester_ip)
            }),
        None => RestError::TooManyOpenWebsocketConnections.into_response(),
    }
}

/// The subscriber id is reserved before the upgrade, so it is released here
/// when the handshake does not complete.
fn release_on_failed_upgrade(
    store: Arc<ServerState>,
    subscriber_id: SubscriberId,
    requester_ip: Option<IpAddr>,
) -> impl FnOnce(axum::Error) + Send + 'static {
    move |e| {
        tracing::debug!(subscriber = subscriber_id, error = ?e, "Websocket upgrade failed");
        store.ws.remove_subscriber(subscriber_id, requester_ip);
    }
}

async fn websocket_handler(
    stream: WebSocket,
    state: Arc<ServerState>,
    subscriber_id: SubscriberId,
    requester_ip: Option<IpAddr>,
) {
    metrics::gauge!(WEBSOCKET_CONNECTIONS_METRIC).increment(1.0);
    tracing::info!(subscriber = subscriber_id, ip = ?requester_ip, "Client connected");

    let (sender, receiver) = stream.split();
    let new_receiver = state.ws.broadcast_receiver.resubscribe();
    let mut subscriber = Subscriber::new(
        subscriber_id,
        state.clone(),
        new_receiver,
        receiver,
        sender,
    );
    subscriber.run().await;

    state.ws.remove_subscriber(subscriber_id, requester_ip);
    metrics::gauge!(WEBSOCKET_CONNECTIONS_METRIC).decrement(1.0);
    tracing::info!(subscriber = subscriber_id, "Client disconnected");
}

/// Announced to every connection.
#[derive(Clone, PartialEq, Debug)]
pub enum UpdateEvent {
    NewBid(Auction),
}

pub type SubscriberId = usize;

/// Subscriber is an actor that handles a single websocket connection.
/// It sends the auction state on connect, forwards new bids to the client
/// and submits the bids the client places.
pub struct Subscriber {
    id:                  SubscriberId,
    closed:              bool,
    store:               Arc<ServerState>,
    notify_receiver:     broadcast::Receiver<UpdateEvent>,
    receiver:            SplitStream<WebSocket>,
    sender:              SplitSink<WebSocket, Message>,
    ping_interval:       tokio::time::Interval,
    exit_check_interval: tokio::time::Interval,
    responded_to_ping:   bool,
}

const PING_INTERVAL_DURATION: Duration = Duration::from_secs(30);

impl Subscriber {
    pub fn new(
        id: SubscriberId,
        store: Arc<ServerState>,
        notify_receiver: broadcast::Receiver<UpdateEvent>,
        receiver: SplitStream<WebSocket>,
        sender: SplitSink<WebSocket, Message>,
    ) -> Self {
        Self {
            id,
            closed: false,
            store,
            notify_receiver,
            receiver,
            sender,
            ping_interval: tokio::time::interval(PING_INTERVAL_DURATION),
            exit_check_interval: tokio::time::interval(EXIT_CHECK_INTERVAL),
            responded_to_ping: true, // We start with true so we don't close the connection immediately
        }
    }

    pub async fn run(&mut self) {
        if let Err(e) = self.send_current_state().await {
            tracing::debug!(subscriber = self.id, error = ?e, "Error sending the current state.");
            return;
        }
        while !self.closed {
            if let Err(e) = self.handle_next().await {
                tracing::debug!(
                    subscriber = self.id,
                    error = ?e,
                    "Error Handling Subscriber Message."
                );
                break;
            }
        }
    }

    async fn send_message(&mut self, message: &ServerMessage) -> Result<()> {
        let message = serde_json::to_string(message)?;
        self.sender.send(message.into()).await?;
        Ok(())
    }

    /// Sends `estadoAtual` as the first frame. A connection that cannot be given
    /// the auction state is told why and closed.
    async fn send_current_state(&mut self) -> Result<()> {
        match self.store.auction_service.get_or_create_auction().await {
            Ok(auction) => {
                self.send_message(&ServerMessage::CurrentState(auction.into()))
                    .await
            }
            Err(e) => {
                self.send_message(&to_server_message(e)).await?;
                self.sender.close().await?;
                self.closed = true;
                Err(anyhow!("Auction is unavailable. Closing connection."))
            }
        }
    }

    async fn handle_next(&mut self) -> Result<()> {
        tokio::select! {
            maybe_update_event = self.notify_receiver.recv() => {
                match maybe_update_event {
                    Ok(event) => self.handle_update(event).await,
                    Err(e) => Err(anyhow!("Error receiving update event: {:?}", e)),
                }
            },
            maybe_message_or_err = self.receiver.next() => {
                self.handle_client_message(
                    maybe_message_or_err.ok_or(anyhow!("Client channel is closed"))??
                ).await
            },
            _  = self.ping_interval.tick() => {
                if !self.responded_to_ping {
                    return Err(anyhow!("Subscriber did not respond to ping. Closing connection."));
                }
                self.responded_to_ping = false;
                self.sender.send(Message::Ping(vec![])).await?;
                Ok(())
            },
            _ = self.exit_check_interval.tick() => {
                if SHOULD_EXIT.load(Ordering::Acquire) {
                    self.sender.close().await?;
                    self.closed = true;
                    return Err(anyhow!("Application is shutting down. Closing connection."));
                }
                Ok(())
            }
        }
    }

    async fn handle_update(&mut self, event: UpdateEvent) -> Result<()> {
        match event {
            UpdateEvent::NewBid(auction) => {
                self.send_message(&ServerMessage::NewBid(auction)).await
            }
        }
    }

    /// Rejections are answered to this connection only. An accepted bid reaches
    /// this connection through the broadcast, like every other connection.
    #[instrument(skip_all, fields(subscriber = self.id))]
    async fn handle_place_bid(&mut self, bid: BidCreate) -> Result<()> {
        let result = self
            .store
            .auction_service
            .handle_bid(HandleBidInput {
                bid_create: bid.into(),
            })
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => self.send_message(&to_server_message(e)).await,
        }
    }

    async fn handle_client_message(&mut self, message: Message) -> Result<()> {
        let maybe_client_message = match message {
            Message::Close(_) => {
                // Send the close message to gracefully shut down the connection
                // Otherwise the client might get an abnormal Websocket closure
                // error.
                self.sender.close().await?;
                self.closed = true;
                return Ok(());
            }
            Message::Text(text) => serde_json::from_str::<ClientMessage>(&text),
            Message::Binary(data) => serde_json::from_slice::<ClientMessage>(&data),
            Message::Ping(_) => {
                // Axum will send Pong automatically
                return Ok(());
            }
            Message::Pong(_) => {
                self.responded_to_ping = true;
                return Ok(());
            }
        };

        match maybe_client_message {
            Err(e) => {
                tracing::debug!(subscriber = self.id, error = ?e, "Malformed client message");
                self.send_message(&to_server_message(RestError::BadParameters(e.to_string())))
                    .await
            }
            Ok(ClientMessage::PlaceBid(bid)) => self.handle_place_bid(bid).await,
        }
    }
}

fn to_server_message(error: RestError) -> ServerMessage {
    let notice = Notice {
        message: error.to_string(),
    };
    match error {
        RestError::AuctionClosed => ServerMessage::AuctionClosed(notice),
        RestError::InvalidBid => ServerMessage::InvalidBid(notice),
        _ => ServerMessage::Error(notice),
    }
}
