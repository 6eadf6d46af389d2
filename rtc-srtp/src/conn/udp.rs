use super::Conn;

use shared::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// UdpConn is a connected UDP socket used as a [`Conn`].
///
/// Closing it fails pending and future calls with [`Error::ErrConnClosed`]
/// and drops the socket, so its local address can be bound again.
pub struct UdpConn {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    closed: watch::Sender<bool>,
}

impl UdpConn {
    pub fn new(socket: UdpSocket) -> Self {
        let (closed, _) = watch::channel(false);
        UdpConn {
            socket: Mutex::new(Some(Arc::new(socket))),
            closed,
        }
    }

    fn socket(&self) -> Result<Arc<UdpSocket>> {
        self.socket.lock()?.clone().ok_or(Error::ErrConnClosed)
    }

    async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl From<UdpSocket> for UdpConn {
    fn from(socket: UdpSocket) -> Self {
        UdpConn::new(socket)
    }
}

impl Conn for UdpConn {
    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let socket = self.socket()?;
        tokio::select! {
            biased;
            _ = self.wait_closed() => Err(Error::ErrConnClosed),
            result = socket.recv(buf) => Ok(result?),
        }
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        let socket = self.socket()?;
        tokio::select! {
            biased;
            _ = self.wait_closed() => Err(Error::ErrConnClosed),
            result = socket.send(buf) => Ok(result?),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        let socket = self.socket().ok()?;
        socket.local_addr().ok()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        let socket = self.socket().ok()?;
        socket.peer_addr().ok()
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_replace(true);
        // calls still holding the socket drop it once they see the close
        self.socket.lock()?.take();
        Ok(())
    }
}
