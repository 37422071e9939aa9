//! Socket adapter.
//!
//! One adapter per process owns the persistent connection. It runs as a
//! single task (actor) and every caller talks to it through a
//! [`SocketHandle`], so the connection is never touched concurrently.
//!
//! Inbound chat messages are republished on an in-process bus keyed by
//! counterpart id. A [`Subscription`] registers interest in one counterpart;
//! the adapter sends `listen` when the first subscriber for a counterpart
//! arrives and `unlisten` when the last one is dropped. Interests are
//! re-announced after every reconnect.
//!
//! # Reconnection
//!
//! There is no backoff loop. When the transport closes, the adapter marks
//! itself disconnected and connects again on the next command that needs the
//! connection.

use std::collections::HashMap;

use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, oneshot, watch,
};

use crate::{
    Transport,
    error::SocketError,
    frame::{ClientFrame, Interest, ServerFrame},
    model::{AccountId, ChatMessage, CreateSession},
};

/// Messages buffered per counterpart before slow subscribers lag.
const BUS_CAPACITY: usize = 64;

/// Connection status published by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No open connection.
    Disconnected,
    /// Connection open.
    Connected,
}

type Reply<T> = oneshot::Sender<Result<T, SocketError>>;

enum Command {
    Connect(Reply<()>),
    Disconnect,
    Emit { frame: ClientFrame, reply: Reply<()> },
    Subscribe {
        counterpart: AccountId,
        commands: mpsc::UnboundedSender<Command>,
        reply: Reply<Subscription>,
    },
    Release { counterpart: AccountId },
}

struct Bus {
    sender: broadcast::Sender<ChatMessage>,
    subscribers: usize,
}

/// Actor owning the transport.
pub struct SocketAdapter<T: Transport> {
    transport: T,
    commands: mpsc::UnboundedReceiver<Command>,
    buses: HashMap<AccountId, Bus>,
    connected: bool,
    state: watch::Sender<ConnectionState>,
}

/// Cloneable handle to a running [`SocketAdapter`].
#[derive(Clone)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

/// Interest in messages from one counterpart.
///
/// Dropping the subscription releases the interest.
pub struct Subscription {
    counterpart: AccountId,
    messages: broadcast::Receiver<ChatMessage>,
    commands: mpsc::UnboundedSender<Command>,
}

impl<T: Transport> SocketAdapter<T> {
    /// Create an adapter and its handle. Nothing runs until [`Self::run`].
    pub fn new(transport: T) -> (Self, SocketHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(ConnectionState::Disconnected);

        let adapter =
            Self { transport, commands, buses: HashMap::new(), connected: false, state };
        (adapter, SocketHandle { commands: commands_tx, state: state_rx })
    }

    /// Create an adapter and spawn it on the current runtime.
    pub fn spawn(transport: T) -> SocketHandle {
        let (adapter, handle) = Self::new(transport);
        tokio::spawn(adapter.run());
        handle
    }

    /// Serve commands until every handle and subscription is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                inbound = self.transport.recv(), if self.connected => self.on_inbound(inbound),
            }
        }

        if self.connected {
            self.transport.close().await;
        }
        tracing::debug!("socket adapter stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => {
                let _ = reply.send(self.ensure_connected().await.map(|_| ()));
            },
            Command::Disconnect => {
                if self.connected {
                    self.transport.close().await;
                    self.mark_disconnected();
                    tracing::info!("socket disconnected");
                }
            },
            Command::Emit { frame, reply } => {
                let event = frame.event();
                let result = match self.ensure_connected().await {
                    Ok(_) => self.transmit(&frame).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    tracing::warn!(event, error = %e, "emit failed");
                }
                let _ = reply.send(result);
            },
            Command::Subscribe { counterpart, commands, reply } => {
                // Built here so an abandoned reply still releases the interest on drop.
                let subscription = self
                    .subscribe(counterpart)
                    .await
                    .map(|messages| Subscription { counterpart, messages, commands });
                let _ = reply.send(subscription);
            },
            Command::Release { counterpart } => self.release(counterpart).await,
        }
    }

    async fn subscribe(
        &mut self,
        counterpart: AccountId,
    ) -> Result<broadcast::Receiver<ChatMessage>, SocketError> {
        if let Some(bus) = self.buses.get_mut(&counterpart) {
            bus.subscribers += 1;
            return Ok(bus.sender.subscribe());
        }

        let (sender, receiver) = broadcast::channel(BUS_CAPACITY);
        self.buses.insert(counterpart, Bus { sender, subscribers: 1 });

        // A fresh connection announces every registered interest itself.
        let announced = match self.ensure_connected().await {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.transmit(&ClientFrame::Listen(Interest { user_id: counterpart })).await
            },
            Err(e) => Err(e),
        };

        match announced {
            Ok(()) => {
                tracing::debug!(counterpart, "listening");
                Ok(receiver)
            },
            Err(e) => {
                self.buses.remove(&counterpart);
                Err(e)
            },
        }
    }

    async fn release(&mut self, counterpart: AccountId) {
        let Some(bus) = self.buses.get_mut(&counterpart) else {
            return;
        };
        bus.subscribers = bus.subscribers.saturating_sub(1);
        if bus.subscribers > 0 {
            return;
        }

        self.buses.remove(&counterpart);
        tracing::debug!(counterpart, "no listeners left");
        let unlisten = ClientFrame::Unlisten(Interest { user_id: counterpart });
        if self.connected && let Err(e) = self.transmit(&unlisten).await {
            tracing::warn!(counterpart, error = %e, "unlisten failed");
        }
    }

    /// Connect if needed. Returns `true` if a new connection was opened.
    async fn ensure_connected(&mut self) -> Result<bool, SocketError> {
        if self.connected {
            return Ok(false);
        }

        self.transport.connect().await?;
        self.connected = true;
        self.state.send_replace(ConnectionState::Connected);
        tracing::info!(interests = self.buses.len(), "socket connected");

        let interests: Vec<AccountId> = self.buses.keys().copied().collect();
        for user_id in interests {
            self.transmit(&ClientFrame::Listen(Interest { user_id })).await?;
        }
        Ok(true)
    }

    async fn transmit(&mut self, frame: &ClientFrame) -> Result<(), SocketError> {
        let text = frame.encode()?;
        if let Err(e) = self.transport.send(text).await {
            self.mark_disconnected();
            return Err(e.into());
        }
        tracing::trace!(event = frame.event(), "frame sent");
        Ok(())
    }

    fn on_inbound(&mut self, inbound: Option<Result<String, crate::TransportError>>) {
        let text = match inbound {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "socket read failed");
                return;
            },
            None => {
                tracing::info!("socket closed by peer");
                self.mark_disconnected();
                return;
            },
        };

        match ServerFrame::decode(&text) {
            Ok(ServerFrame::Message(inbound)) => match self.buses.get(&inbound.user_id) {
                Some(bus) => {
                    let _ = bus.sender.send(inbound.message);
                },
                None => tracing::debug!(counterpart = inbound.user_id, "message without listener"),
            },
            Err(e) => tracing::warn!(error = %e, "malformed frame"),
        }
    }

    fn mark_disconnected(&mut self) {
        self.connected = false;
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl SocketHandle {
    async fn request<R>(&self, build: impl FnOnce(Reply<R>) -> Command) -> Result<R, SocketError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(build(reply)).map_err(|_| SocketError::Closed)?;
        response.await.map_err(|_| SocketError::Closed)?
    }

    /// Open the connection if it is not already open.
    pub async fn connect(&self) -> Result<(), SocketError> {
        self.request(Command::Connect).await
    }

    /// Close the connection. Subscriptions stay registered.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Ask the server to create a chat session. No acknowledgement is read.
    pub async fn emit_create_session(&self, request: CreateSession) -> Result<(), SocketError> {
        let frame = ClientFrame::CreateChatSession(request);
        self.request(|reply| Command::Emit { frame, reply }).await
    }

    /// Deliver a chat message.
    pub async fn send_message(&self, message: ChatMessage) -> Result<(), SocketError> {
        let frame = ClientFrame::SendMessage(message);
        self.request(|reply| Command::Emit { frame, reply }).await
    }

    /// Receive messages sent by `counterpart`.
    pub async fn subscribe(&self, counterpart: AccountId) -> Result<Subscription, SocketError> {
        let commands = self.commands.clone();
        self.request(|reply| Command::Subscribe { counterpart, commands, reply }).await
    }

    /// Current connection status.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every connection status change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

impl Subscription {
    /// Counterpart this subscription listens to.
    pub fn counterpart(&self) -> AccountId {
        self.counterpart
    }

    /// Next message. `None` once the adapter has stopped.
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        loop {
            match self.messages.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(counterpart = self.counterpart, skipped, "subscriber lagged");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Release { counterpart: self.counterpart });
    }
}
