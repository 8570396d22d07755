//! TCP link between simulator instances.
//!
//! A [`Transport`] runs in one role at a time. As a server it accepts any
//! number of peers and echoes every inbound message to all of them, the
//! sender included, so several instances on one server observe each other's
//! traffic. As a client it holds a single connection. Both roles frame
//! messages with a 4-byte big-endian length prefix (see [`framing`]).
//!
//! Peer failures stay local to the peer: the background tasks log and drop
//! the connection, they never take the process down.

pub mod client;
pub mod framing;
mod server;

pub use framing::{LENGTH_PREFIX_LEN, MAX_MESSAGE_LEN};

use crate::protocol::{Frame, FrameCodec};
use client::Client;
use log::{debug, info, warn};
use server::Server;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::{lookup_host, TcpListener};
use tokio::sync::Mutex;

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

pub type ReceiveCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

pub(crate) type CallbackSlot = Arc<RwLock<Option<ReceiveCallback>>>;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport already running as {0}")]
    AlreadyActive(&'static str),
    #[error("transport is not connected")]
    NotConnected,
    #[error("connection to {0} timed out")]
    ConnectTimeout(SocketAddr),
    #[error("message of {0} bytes exceeds the transport limit")]
    MessageTooLarge(usize),
}

pub(crate) fn deliver(slot: &CallbackSlot, payload: Vec<u8>) {
    let callback = slot.read().ok().and_then(|guard| guard.clone());
    match callback {
        Some(callback) => callback(payload),
        None => debug!("no receive callback, dropped {} bytes", payload.len()),
    }
}

enum Link {
    Server(Server),
    Client(Client),
}

impl Link {
    fn role(&self) -> &'static str {
        match self {
            Link::Server(_) => "server",
            Link::Client(_) => "client",
        }
    }
}

pub struct Transport {
    link: Mutex<Option<Arc<Link>>>,
    callback: CallbackSlot,
    write_timeout: Duration,
}

impl Transport {
    pub fn new() -> Self {
        Self::with_write_timeout(DEFAULT_WRITE_TIMEOUT)
    }

    /// A peer that accepts no bytes for `write_timeout` fails the send and,
    /// in server role, is evicted.
    pub fn with_write_timeout(write_timeout: Duration) -> Self {
        Self {
            link: Mutex::new(None),
            callback: Arc::new(RwLock::new(None)),
            write_timeout,
        }
    }

    pub fn set_receive_callback<F>(&self, callback: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.callback.write() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Binds and starts accepting; returns the bound address (useful with port 0).
    pub async fn start_server(&self, host: &str, port: u16) -> Result<SocketAddr, TransportError> {
        let mut link = self.link.lock().await;
        if let Some(active) = link.as_ref() {
            return Err(TransportError::AlreadyActive(active.role()));
        }
        let addr = resolve(host, port).await?;
        let listener = TcpListener::bind(addr).await?;
        let server = Server::spawn(listener, Arc::clone(&self.callback), self.write_timeout)?;
        let local_addr = server.local_addr();
        *link = Some(Arc::new(Link::Server(server)));
        Ok(local_addr)
    }

    pub async fn connect_client(&self, host: &str, port: u16) -> Result<SocketAddr, TransportError> {
        let mut link = self.link.lock().await;
        if let Some(active) = link.as_ref() {
            return Err(TransportError::AlreadyActive(active.role()));
        }
        let addr = resolve(host, port).await?;
        let client = Client::connect(addr, Arc::clone(&self.callback), self.write_timeout).await?;
        *link = Some(Arc::new(Link::Client(client)));
        Ok(addr)
    }

    // Handle cloned out of the lock so socket I/O never runs under it.
    async fn current(&self) -> Option<Arc<Link>> {
        self.link.lock().await.clone()
    }

    /// Closes every socket and waits for the background tasks. Idempotent.
    pub async fn disconnect(&self) {
        let link = self.link.lock().await.take();
        match link.as_deref() {
            Some(Link::Server(server)) => server.close().await,
            Some(Link::Client(client)) => client.close().await,
            None => debug!("disconnect with no active link"),
        }
    }

    /// Sends one prefixed message. In server role true only if every peer
    /// accepted the write; with no peers connected there is nothing to fail.
    pub async fn send(&self, payload: &[u8]) -> bool {
        let message = match framing::encode_message(payload) {
            Ok(message) => message,
            Err(err) => {
                warn!("send refused: {}", err);
                return false;
            }
        };
        match self.current().await.as_deref() {
            Some(Link::Server(server)) => server.send(message).await,
            Some(Link::Client(client)) => client.send(&message).await,
            None => {
                debug!("send dropped: {}", TransportError::NotConnected);
                false
            }
        }
    }

    pub async fn send_frame(&self, frame: &Frame) -> bool {
        self.send(&FrameCodec::encode(frame)).await
    }

    pub async fn is_active(&self) -> bool {
        match self.current().await.as_deref() {
            Some(Link::Server(_)) => true,
            Some(Link::Client(client)) => client.is_connected(),
            None => false,
        }
    }

    pub async fn role(&self) -> Option<&'static str> {
        self.current().await.as_deref().map(Link::role)
    }

    pub async fn peer_count(&self) -> usize {
        match self.current().await.as_deref() {
            Some(Link::Server(server)) => server.peer_count().await,
            Some(Link::Client(client)) => usize::from(client.is_connected()),
            None => 0,
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let endpoint = format!("{}:{}", host, port);
    if host.trim().is_empty() {
        return Err(TransportError::InvalidEndpoint {
            endpoint,
            reason: "empty host".to_string(),
        });
    }
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|err| TransportError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: err.to_string(),
        })?;
    let addr = addrs.next().ok_or_else(|| TransportError::InvalidEndpoint {
        endpoint: endpoint.clone(),
        reason: "no address".to_string(),
    })?;
    info!("resolved {} to {}", endpoint, addr);
    Ok(addr)
}
