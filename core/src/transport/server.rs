//! Server role: accept loop plus one receive task per peer. Every inbound
//! message goes to the callback and is echoed to all peers, sender included.
//!
//! Writes never run under the peer-table lock. Each broadcast snapshots the
//! writers, writes to all of them concurrently with a deadline, and evicts
//! every peer that failed or timed out.

use crate::protocol::hexdump;
use crate::transport::framing::{encode_message, read_message};
use crate::transport::{deliver, CallbackSlot};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

type PeerWriter = Arc<Mutex<OwnedWriteHalf>>;

struct Peer {
    writer: PeerWriter,
    // Dropping this ends the peer's receive task.
    _evict: oneshot::Sender<()>,
}

type Peers = Arc<Mutex<HashMap<u64, Peer>>>;

pub(crate) struct Server {
    local_addr: SocketAddr,
    peers: Peers,
    write_timeout: Duration,
    shutdown: watch::Sender<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    pub(crate) fn spawn(
        listener: TcpListener,
        callback: CallbackSlot,
        write_timeout: Duration,
    ) -> std::io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let peers: Peers = Arc::new(Mutex::new(HashMap::new()));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&peers),
            callback,
            write_timeout,
            shutdown_rx,
        ));
        info!("transport server listening on {}", local_addr);
        Ok(Self {
            local_addr,
            peers,
            write_timeout,
            shutdown,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) async fn peer_count(&self) -> usize {
        self.peers.lock().await.len()
    }

    pub(crate) async fn send(&self, message: Vec<u8>) -> bool {
        broadcast(&self.peers, message, self.write_timeout).await
    }

    /// Stops accepting, ends every peer task and closes every socket.
    pub(crate) async fn close(&self) {
        let _ = self.shutdown.send(true);
        let accept_task = self.accept_task.lock().await.take();
        if let Some(accept_task) = accept_task {
            if let Err(err) = accept_task.await {
                error!("transport accept task failed: {}", err);
            }
        }
        self.peers.lock().await.clear();
        info!("transport server on {} closed", self.local_addr);
    }
}

async fn accept_loop(
    listener: TcpListener,
    peers: Peers,
    callback: CallbackSlot,
    write_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();
    let mut next_id = 0u64;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    next_id += 1;
                    info!("peer {} connected from {}", next_id, addr);
                    let (reader, writer) = stream.into_split();
                    let (evict, evicted) = oneshot::channel();
                    peers.lock().await.insert(
                        next_id,
                        Peer {
                            writer: Arc::new(Mutex::new(writer)),
                            _evict: evict,
                        },
                    );
                    connections.spawn(serve_peer(
                        next_id,
                        reader,
                        Arc::clone(&peers),
                        Arc::clone(&callback),
                        write_timeout,
                        evicted,
                        shutdown.clone(),
                    ));
                }
                Err(err) => {
                    warn!("accept failed: {}", err);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.abort_all();
    while connections.join_next().await.is_some() {}
}

async fn serve_peer(
    id: u64,
    mut reader: OwnedReadHalf,
    peers: Peers,
    callback: CallbackSlot,
    write_timeout: Duration,
    mut evicted: oneshot::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.changed() => break,
            _ = &mut evicted => {
                debug!("peer {} evicted", id);
                return;
            }
            message = read_message(&mut reader) => message,
        };
        match message {
            Ok(Some(payload)) => {
                debug!("peer {} sent {} bytes: {}", id, payload.len(), hexdump(&payload, 16));
                let echo = encode_message(&payload);
                deliver(&callback, payload);
                if let Ok(echo) = echo {
                    broadcast(&peers, echo, write_timeout).await;
                }
            }
            Ok(None) => {
                info!("peer {} disconnected", id);
                break;
            }
            Err(err) => {
                warn!("peer {} dropped: {}", id, err);
                break;
            }
        }
    }
    peers.lock().await.remove(&id);
}

/// Writes to every peer; peers that fail or stall past `write_timeout` are
/// evicted. True only if all accepted.
async fn broadcast(peers: &Peers, message: Vec<u8>, write_timeout: Duration) -> bool {
    let writers: Vec<(u64, PeerWriter)> = peers
        .lock()
        .await
        .iter()
        .map(|(id, peer)| (*id, Arc::clone(&peer.writer)))
        .collect();

    let message: Arc<[u8]> = message.into();
    let mut writes = JoinSet::new();
    for (id, writer) in writers {
        let message = Arc::clone(&message);
        writes.spawn(async move {
            let write = async {
                let mut writer = writer.lock().await;
                writer.write_all(&message).await
            };
            let outcome = match tokio::time::timeout(write_timeout, write).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err(format!("no progress within {:?}", write_timeout)),
            };
            (id, outcome)
        });
    }

    let mut failed = Vec::new();
    while let Some(joined) = writes.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((id, Err(reason))) => {
                warn!("write to peer {} failed: {}", id, reason);
                failed.push(id);
            }
            Err(err) => {
                error!("peer write task failed: {}", err);
                return false;
            }
        }
    }

    if !failed.is_empty() {
        let mut peers = peers.lock().await;
        for id in &failed {
            if peers.remove(id).is_some() {
                info!("evicted peer {}", id);
            }
        }
    }
    failed.is_empty()
}
