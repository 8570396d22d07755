//! Client role: one connection, one receive loop, no fan-out.

use crate::protocol::hexdump;
use crate::transport::framing::read_message;
use crate::transport::{deliver, CallbackSlot, TransportError};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub(crate) struct Client {
    peer_addr: SocketAddr,
    writer: Mutex<OwnedWriteHalf>,
    connected: Arc<AtomicBool>,
    write_timeout: Duration,
    shutdown: watch::Sender<bool>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    pub(crate) async fn connect(
        addr: SocketAddr,
        callback: CallbackSlot,
        write_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout(addr))??;
        if let Err(err) = stream.set_nodelay(true) {
            debug!("could not disable Nagle on {}: {}", addr, err);
        }
        let (reader, writer) = stream.into_split();
        let connected = Arc::new(AtomicBool::new(true));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let receive_task = tokio::spawn(receive_loop(
            reader,
            callback,
            Arc::clone(&connected),
            shutdown_rx,
        ));
        info!("transport client connected to {}", addr);
        Ok(Self {
            peer_addr: addr,
            writer: Mutex::new(writer),
            connected,
            write_timeout,
            shutdown,
            receive_task: Mutex::new(Some(receive_task)),
        })
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) async fn send(&self, message: &[u8]) -> bool {
        let write = async {
            let mut writer = self.writer.lock().await;
            writer.write_all(message).await
        };
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!("write to {} failed: {}", self.peer_addr, err);
                self.connected.store(false, Ordering::SeqCst);
                false
            }
            Err(_) => {
                warn!("write to {} stalled for {:?}", self.peer_addr, self.write_timeout);
                false
            }
        }
    }

    pub(crate) async fn close(&self) {
        let _ = self.shutdown.send(true);
        let receive_task = self.receive_task.lock().await.take();
        if let Some(receive_task) = receive_task {
            if let Err(err) = receive_task.await {
                error!("transport receive task failed: {}", err);
            }
        }
        let shutdown = async {
            let mut writer = self.writer.lock().await;
            writer.shutdown().await
        };
        let _ = tokio::time::timeout(self.write_timeout, shutdown).await;
        self.connected.store(false, Ordering::SeqCst);
        info!("transport client to {} closed", self.peer_addr);
    }
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    callback: CallbackSlot,
    connected: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.changed() => break,
            message = read_message(&mut reader) => message,
        };
        match message {
            Ok(Some(payload)) => {
                debug!("received {} bytes: {}", payload.len(), hexdump(&payload, 16));
                deliver(&callback, payload);
            }
            Ok(None) => {
                info!("server closed the connection");
                break;
            }
            Err(err) => {
                warn!("receive failed: {}", err);
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}
