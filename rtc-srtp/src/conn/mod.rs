#[cfg(test)]
mod conn_test;

mod deadline;
pub mod pipe;
pub mod udp;

use crate::config::Config;
use crate::context::Context;
use crate::option::{srtcp_replay_protection, srtp_replay_protection};
use deadline::Deadline;

use log::{debug, trace, warn};
use shared::error::{Error, Result};
use shared::util::{PacketClass, classify, is_rtcp, protocol_name};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, watch};

const DEFAULT_SESSION_SRTP_REPLAY_PROTECTION_WINDOW: usize = 64;
const DEFAULT_SESSION_SRTCP_REPLAY_PROTECTION_WINDOW: usize = 64;

/// RECEIVE_MTU is the largest datagram read from the underlying transport.
/// Datagrams are always read whole, never in pieces.
pub const RECEIVE_MTU: usize = 8192;

/// Conn is a datagram transport shared with other protocols (ICE, DTLS).
pub trait Conn: Send + Sync {
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;
    fn send(&self, buf: &[u8]) -> impl Future<Output = Result<usize>> + Send;
    fn local_addr(&self) -> Option<SocketAddr>;
    fn remote_addr(&self) -> Option<SocketAddr>;
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// ConnStats counts datagrams seen by a [`SrtpConn`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnStats {
    pub packets_read: u64,
    pub packets_written: u64,
    /// Datagrams outside the SRTP/SRTCP range, e.g. STUN or DTLS.
    pub other_dropped: u64,
    /// SRTP/SRTCP datagrams that failed to authenticate, were replayed or
    /// belonged to a flow that could not be tracked.
    pub unprotect_dropped: u64,
}

#[derive(Default)]
struct AtomicConnStats {
    packets_read: AtomicU64,
    packets_written: AtomicU64,
    other_dropped: AtomicU64,
    unprotect_dropped: AtomicU64,
}

/// SrtpConn protects media written to, and unprotects media read from, a
/// transport shared with non-media traffic.
///
/// Reads return one unprotected RTP or RTCP packet at a time; datagrams of
/// any other protocol are silently discarded. Reads are serialized among
/// themselves, as are writes, but a read never blocks a write.
pub struct SrtpConn<C: Conn> {
    conn: C,
    local_context: Context,
    remote_context: Context,

    reader: Mutex<Vec<u8>>,
    writer: Mutex<()>,

    closed: watch::Sender<bool>,
    read_deadline: Deadline,
    write_deadline: Deadline,

    stats: AtomicConnStats,
}

impl<C: Conn> SrtpConn<C> {
    /// new builds the local (protect) and remote (unprotect) contexts from
    /// the config. Replay protection is on for the remote side unless the
    /// config says otherwise.
    pub fn new(conn: C, config: Config) -> Result<Self> {
        let local_context = Context::with_max_flows(
            &config.keys.local_master_key,
            &config.keys.local_master_salt,
            config.profile,
            config.local_rtp_options,
            config.local_rtcp_options,
            config.max_flows,
        )?;

        let remote_context = Context::with_max_flows(
            &config.keys.remote_master_key,
            &config.keys.remote_master_salt,
            config.profile,
            if config.remote_rtp_options.is_none() {
                Some(srtp_replay_protection(
                    DEFAULT_SESSION_SRTP_REPLAY_PROTECTION_WINDOW,
                ))
            } else {
                config.remote_rtp_options
            },
            if config.remote_rtcp_options.is_none() {
                Some(srtcp_replay_protection(
                    DEFAULT_SESSION_SRTCP_REPLAY_PROTECTION_WINDOW,
                ))
            } else {
                config.remote_rtcp_options
            },
            config.max_flows,
        )?;

        let (closed, _) = watch::channel(false);

        Ok(SrtpConn {
            conn,
            local_context,
            remote_context,
            reader: Mutex::new(vec![0u8; RECEIVE_MTU]),
            writer: Mutex::new(()),
            closed,
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
            stats: AtomicConnStats::default(),
        })
    }

    /// read blocks until an RTP or RTCP packet authenticates, then copies it
    /// into `buf`.
    ///
    /// Fails with [`Error::ErrConnClosed`] once the conn is closed, with
    /// [`Error::ErrDeadlineExceeded`] once the read deadline passes and with
    /// [`Error::ErrBufferShort`] if the packet does not fit in `buf`, in
    /// which case the packet is consumed.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::ErrConnClosed);
        }

        tokio::select! {
            biased;
            _ = self.wait_closed() => Err(Error::ErrConnClosed),
            _ = self.read_deadline.expired() => Err(Error::ErrDeadlineExceeded),
            result = self.read_packet(buf) => result,
        }
    }

    async fn read_packet(&self, buf: &mut [u8]) -> Result<usize> {
        let mut inbound = self.reader.lock().await;

        loop {
            let n = match self.conn.recv(&mut inbound[..]).await {
                Ok(n) => n,
                Err(_) if self.is_closed() => return Err(Error::ErrConnClosed),
                Err(err) => return Err(err),
            };
            let datagram = &inbound[..n];

            if classify(datagram) == PacketClass::Other {
                trace!("discarding {} datagram of {} bytes", protocol_name(datagram), n);
                self.stats.other_dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let result = if is_rtcp(datagram) {
                self.remote_context.decrypt_rtcp(datagram)
            } else {
                self.remote_context.decrypt_rtp(datagram)
            };

            match result {
                Ok(decrypted) => {
                    self.stats.packets_read.fetch_add(1, Ordering::Relaxed);
                    if decrypted.len() > buf.len() {
                        return Err(Error::ErrBufferShort);
                    }
                    buf[..decrypted.len()].copy_from_slice(&decrypted);
                    return Ok(decrypted.len());
                }
                Err(err) => {
                    debug!("discarding {} datagram: {}", protocol_name(datagram), err);
                    self.stats.unprotect_dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// write protects one RTP or RTCP packet and sends it.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::ErrConnClosed);
        }

        tokio::select! {
            biased;
            _ = self.wait_closed() => Err(Error::ErrConnClosed),
            _ = self.write_deadline.expired() => Err(Error::ErrDeadlineExceeded),
            result = self.write_packet(buf) => result,
        }
    }

    async fn write_packet(&self, buf: &[u8]) -> Result<usize> {
        let _writer = self.writer.lock().await;

        let encrypted = if is_rtcp(buf) {
            self.local_context.encrypt_rtcp(buf)?
        } else {
            self.local_context.encrypt_rtp(buf)?
        };

        match self.conn.send(&encrypted).await {
            Ok(_) => {
                self.stats.packets_written.fetch_add(1, Ordering::Relaxed);
                Ok(buf.len())
            }
            Err(_) if self.is_closed() => Err(Error::ErrConnClosed),
            Err(err) => Err(err),
        }
    }

    /// close closes the underlying transport and fails every pending and
    /// future read and write with [`Error::ErrConnClosed`]. It returns once
    /// pending calls have returned. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        debug!("closing srtp conn");

        if let Err(err) = self.conn.close().await {
            warn!("failed to close underlying conn: {err}");
            return Err(err);
        }

        // wait for pending reads and writes to observe the close, so the
        // conn is no longer in use once close returns
        let _reader = self.reader.lock().await;
        let _writer = self.writer.lock().await;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        // the sender lives as long as self
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// set_read_deadline sets the instant after which blocked and future
    /// reads fail with [`Error::ErrDeadlineExceeded`]. None disables it.
    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        self.read_deadline.set(deadline);
    }

    /// set_write_deadline is the write counterpart of set_read_deadline.
    pub fn set_write_deadline(&self, deadline: Option<Instant>) {
        self.write_deadline.set(deadline);
    }

    /// set_deadline sets both the read and the write deadline.
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    pub fn read_deadline(&self) -> Option<Instant> {
        self.read_deadline.get()
    }

    pub fn write_deadline(&self) -> Option<Instant> {
        self.write_deadline.get()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.conn.local_addr()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.conn.remote_addr()
    }

    /// local_context is the context protecting outbound packets.
    pub fn local_context(&self) -> &Context {
        &self.local_context
    }

    /// remote_context is the context unprotecting inbound packets.
    pub fn remote_context(&self) -> &Context {
        &self.remote_context
    }

    pub fn stats(&self) -> ConnStats {
        ConnStats {
            packets_read: self.stats.packets_read.load(Ordering::Relaxed),
            packets_written: self.stats.packets_written.load(Ordering::Relaxed),
            other_dropped: self.stats.other_dropped.load(Ordering::Relaxed),
            unprotect_dropped: self.stats.unprotect_dropped.load(Ordering::Relaxed),
        }
    }
}
