//! Socket transport abstraction.
//!
//! A [`Transport`] moves text frames over one persistent connection and knows
//! nothing about their meaning; the [`crate::SocketAdapter`] owns framing and
//! subscription bookkeeping. [`MemoryTransport`] pairs with a [`MemoryServer`]
//! for tests and offline runs; the WebSocket implementation lives in
//! [`crate::ws`] behind the `transport` feature.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Persistent text-frame connection.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Open the connection. Called again after the previous one closed.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound text frame. `None` once the connection has closed.
    ///
    /// Must be cancel safe: the adapter polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection.
    async fn close(&mut self);
}

enum ServerEvent {
    Frame(String),
    Hangup,
}

/// In-process transport backed by channels.
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<ServerEvent>,
    connects: Arc<AtomicUsize>,
    refuse: Arc<AtomicUsize>,
    connected: bool,
}

/// Server end of a [`MemoryTransport`].
pub struct MemoryServer {
    received: mpsc::UnboundedReceiver<String>,
    inject: mpsc::UnboundedSender<ServerEvent>,
    connects: Arc<AtomicUsize>,
    refuse: Arc<AtomicUsize>,
}

impl MemoryTransport {
    /// Create a connected pair.
    pub fn pair() -> (Self, MemoryServer) {
        let (outbound, received) = mpsc::unbounded_channel();
        let (inject, inbound) = mpsc::unbounded_channel();
        let connects = Arc::new(AtomicUsize::new(0));
        let refuse = Arc::new(AtomicUsize::new(0));

        let transport = Self {
            outbound,
            inbound,
            connects: Arc::clone(&connects),
            refuse: Arc::clone(&refuse),
            connected: false,
        };
        (transport, MemoryServer { received, inject, connects, refuse })
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let refusals = self.refuse.load(Ordering::SeqCst);
        if refusals > 0 {
            self.refuse.store(refusals - 1, Ordering::SeqCst);
            return Err(TransportError::Connection("refused".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.outbound.send(frame).map_err(|_| TransportError::Stream("server dropped".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if !self.connected {
            return None;
        }
        match self.inbound.recv().await {
            Some(ServerEvent::Frame(frame)) => Some(Ok(frame)),
            Some(ServerEvent::Hangup) | None => {
                self.connected = false;
                None
            },
        }
    }

    async fn close(&mut self) {
        self.connected = false;
    }
}

impl MemoryServer {
    /// Deliver a text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.inject.send(ServerEvent::Frame(frame.into()));
    }

    /// Close the current connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.inject.send(ServerEvent::Hangup);
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.refuse.store(n, Ordering::SeqCst);
    }

    /// Number of successful connects so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Wait for the next frame sent by the client.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.received.recv().await
    }

    /// Every frame the client has sent that has not been read yet.
    pub fn drain(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.received.try_recv() {
            frames.push(frame);
        }
        frames
    }
}
