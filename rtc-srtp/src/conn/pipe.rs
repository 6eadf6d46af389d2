use super::Conn;

use bytes::Bytes;
use shared::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::Mutex as SyncMutex;
use tokio::sync::{Mutex, mpsc};

/// PipeConn is one end of an in-memory datagram link, see [`pipe`].
pub struct PipeConn {
    rx: Mutex<mpsc::UnboundedReceiver<Bytes>>,
    tx: SyncMutex<Option<mpsc::UnboundedSender<Bytes>>>,
}

/// pipe creates two connected in-memory datagram endpoints. Closing one end
/// makes pending and future reads on the other end fail.
pub fn pipe() -> (PipeConn, PipeConn) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    (
        PipeConn {
            rx: Mutex::new(a_rx),
            tx: SyncMutex::new(Some(b_tx)),
        },
        PipeConn {
            rx: Mutex::new(b_rx),
            tx: SyncMutex::new(Some(a_tx)),
        },
    )
}

impl Conn for PipeConn {
    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.rx.lock().await;
        let datagram = rx.recv().await.ok_or(Error::ErrConnClosed)?;
        // datagram semantics: the excess of a short read is discarded
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(n)
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        let tx = self.tx.lock()?;
        match tx.as_ref() {
            Some(tx) => tx
                .send(Bytes::copy_from_slice(buf))
                .map(|_| buf.len())
                .map_err(|_| Error::ErrConnClosed),
            None => Err(Error::ErrConnClosed),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }

    async fn close(&self) -> Result<()> {
        self.tx.lock()?.take();
        Ok(())
    }
}
