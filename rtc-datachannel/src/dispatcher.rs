
use crate::data_channel::{
    DataChannel, DataChannelConfig, DataChannelEvent, DataChannelMessage, DataChannelState,
};
use crate::payload::Payload;
use log::{debug, trace, warn};
use sansio::Protocol;
use shared::error::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// DataChannelHandler receives the events of the data channels it was
/// registered for. Calls for one channel never overlap: the next call is
/// made only after the previous future completed.
pub trait DataChannelHandler: Send + Sync {
    fn on_open(&self, _stream_id: u16) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn on_message(&self, stream_id: u16, payload: Payload) -> BoxFuture<'_, ()>;

    fn on_close(&self, _stream_id: u16) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// DispatcherConfig is used to configure the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Messages buffered toward the reliable transport before `send` waits.
    pub outbound_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

enum Dispatch {
    Open,
    Message(Payload),
    Close,
}

struct Channel {
    data_channel: Mutex<DataChannel>,
    dispatch_tx: mpsc::UnboundedSender<Dispatch>,
    send_lock: tokio::sync::Mutex<()>,
    closed: watch::Sender<bool>,
}

impl Channel {
    /// drain moves everything the data channel produced out of it. Handler
    /// events are queued while the channel lock is held so that they keep
    /// the order in which the channel produced them; outbound messages are
    /// returned for the caller to send.
    fn drain(&self, data_channel: &mut DataChannel) -> Vec<DataChannelMessage> {
        while let Some(event) = data_channel.poll_event() {
            let dispatch = match event {
                DataChannelEvent::Open => Dispatch::Open,
                DataChannelEvent::Close => Dispatch::Close,
            };
            // the receiver only goes away after Close was handled
            let _ = self.dispatch_tx.send(dispatch);
        }
        while let Some(payload) = data_channel.poll_read() {
            let _ = self.dispatch_tx.send(Dispatch::Message(payload));
        }

        let mut outbound = vec![];
        while let Some(msg) = data_channel.poll_write() {
            outbound.push(msg);
        }
        outbound
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// DataChannelDispatcher owns the data channels of one association. Inbound
/// messages are handed over with [`DataChannelDispatcher::handle_inbound`]
/// and delivered, in order, to the handler registered for their channel by
/// a dedicated task per channel. Outbound messages are framed and queued on
/// the channel returned by [`DataChannelDispatcher::new`], which the
/// reliable transport drains.
pub struct DataChannelDispatcher {
    channels: Mutex<HashMap<u16, Arc<Channel>>>,
    outbound_tx: mpsc::Sender<DataChannelMessage>,
}

impl DataChannelDispatcher {
    pub fn new(config: DispatcherConfig) -> (Self, mpsc::Receiver<DataChannelMessage>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        (
            DataChannelDispatcher {
                channels: Mutex::new(HashMap::new()),
                outbound_tx,
            },
            outbound_rx,
        )
    }

    /// dial opens a data channel toward the peer and registers its handler.
    pub async fn dial(
        &self,
        config: DataChannelConfig,
        stream_id: u16,
        handler: Arc<dyn DataChannelHandler>,
    ) -> Result<()> {
        self.ensure_vacant(stream_id)?;
        let data_channel = DataChannel::dial(config, stream_id)?;
        self.register(data_channel, handler).await
    }

    /// accept creates the data channel announced by a DATA_CHANNEL_OPEN
    /// received on a new stream and registers its handler.
    pub async fn accept(
        &self,
        msg: DataChannelMessage,
        handler: Arc<dyn DataChannelHandler>,
    ) -> Result<()> {
        self.ensure_vacant(msg.stream_id)?;
        let data_channel = DataChannel::accept(
            DataChannelConfig::default(),
            msg.stream_id,
            msg.ppi,
            &msg.payload,
        )?;
        self.register(data_channel, handler).await
    }

    fn ensure_vacant(&self, stream_id: u16) -> Result<()> {
        if self.channels.lock()?.contains_key(&stream_id) {
            Err(Error::ErrDataChannelExisted(stream_id))
        } else {
            Ok(())
        }
    }

    async fn register(
        &self,
        data_channel: DataChannel,
        handler: Arc<dyn DataChannelHandler>,
    ) -> Result<()> {
        let stream_id = data_channel.stream_identifier();
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);

        let channel = Arc::new(Channel {
            data_channel: Mutex::new(data_channel),
            dispatch_tx,
            send_lock: tokio::sync::Mutex::new(()),
            closed,
        });
        let outbound = {
            let mut data_channel = channel.data_channel.lock()?;
            channel.drain(&mut data_channel)
        };

        {
            let mut channels = self.channels.lock()?;
            if channels.contains_key(&stream_id) {
                return Err(Error::ErrDataChannelExisted(stream_id));
            }
            channels.insert(stream_id, Arc::clone(&channel));
        }

        tokio::spawn(dispatch_loop(
            stream_id,
            handler,
            dispatch_rx,
            channel.closed.subscribe(),
        ));

        debug!("data channel {stream_id} registered");
        self.send_outbound(&channel, outbound).await
    }

    /// handle_inbound takes a message the reliable transport received for
    /// an existing channel.
    pub async fn handle_inbound(&self, msg: DataChannelMessage) -> Result<()> {
        let channel = self.channel(msg.stream_id)?;
        let outbound = {
            let mut data_channel = channel.data_channel.lock()?;
            data_channel.handle_read(msg)?;
            channel.drain(&mut data_channel)
        };
        self.send_outbound(&channel, outbound).await
    }

    /// send frames the payload and queues it toward the reliable transport.
    /// Payloads sent on one channel keep their order. It waits while the
    /// transport is backpressured and fails with
    /// [`Error::ErrDataChannelClosed`] if the channel is not open or closes
    /// in the meantime.
    pub async fn send(&self, stream_id: u16, payload: Payload) -> Result<usize> {
        let channel = self
            .channel(stream_id)
            .map_err(|_| Error::ErrDataChannelClosed)?;
        let _sender = channel.send_lock.lock().await;

        let outbound = {
            let mut data_channel = channel.data_channel.lock()?;
            data_channel.handle_write(payload)?;
            channel.drain(&mut data_channel)
        };
        let n: usize = outbound.iter().map(|msg| msg.payload.len()).sum();

        self.send_outbound(&channel, outbound).await?;
        Ok(n)
    }

    async fn send_outbound(
        &self,
        channel: &Channel,
        outbound: Vec<DataChannelMessage>,
    ) -> Result<()> {
        let mut closed = channel.closed.subscribe();
        for msg in outbound {
            trace!("data channel {} sending {}", msg.stream_id, msg.ppi);
            tokio::select! {
                biased;
                _ = closed.wait_for(|closed| *closed) => return Err(Error::ErrDataChannelClosed),
                result = self.outbound_tx.send(msg) => {
                    if result.is_err() {
                        return Err(Error::ErrConnClosed);
                    }
                }
            }
        }
        Ok(())
    }

    /// close closes the channel locally. The handler's on_close runs once,
    /// after which nothing else is dispatched, and blocked senders fail
    /// with [`Error::ErrDataChannelClosed`].
    pub fn close(&self, stream_id: u16) -> Result<()> {
        self.shutdown(stream_id, true)
    }

    /// handle_reset is called when the peer reset the channel's stream.
    pub fn handle_reset(&self, stream_id: u16) -> Result<()> {
        self.shutdown(stream_id, false)
    }

    fn shutdown(&self, stream_id: u16, local: bool) -> Result<()> {
        let channel = self
            .channels
            .lock()?
            .remove(&stream_id)
            .ok_or(Error::ErrDataChannelNotExisted)?;

        channel.closed.send_replace(true);
        let mut data_channel = channel.data_channel.lock()?;
        if local {
            data_channel.close()?;
        }
        data_channel.handle_reset();
        let dropped = channel.drain(&mut data_channel);
        if !dropped.is_empty() {
            warn!(
                "data channel {stream_id} closed with {} messages unsent",
                dropped.len()
            );
        }
        Ok(())
    }

    /// state returns the state of a registered channel. Closed channels are
    /// forgotten and report None.
    pub fn state(&self, stream_id: u16) -> Option<DataChannelState> {
        let channel = self.channels.lock().ok()?.get(&stream_id).cloned()?;
        let state = channel.data_channel.lock().ok()?.state();
        Some(state)
    }

    /// config returns the configuration a channel was opened with.
    pub fn config(&self, stream_id: u16) -> Result<DataChannelConfig> {
        let channel = self.channel(stream_id)?;
        let config = channel.data_channel.lock()?.config().clone();
        Ok(config)
    }

    pub fn stream_ids(&self) -> Result<Vec<u16>> {
        let mut ids: Vec<u16> = self.channels.lock()?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn channel(&self, stream_id: u16) -> Result<Arc<Channel>> {
        self.channels
            .lock()?
            .get(&stream_id)
            .cloned()
            .ok_or(Error::ErrDataChannelNotExisted)
    }
}

async fn dispatch_loop(
    stream_id: u16,
    handler: Arc<dyn DataChannelHandler>,
    mut dispatch_rx: mpsc::UnboundedReceiver<Dispatch>,
    closed: watch::Receiver<bool>,
) {
    while let Some(dispatch) = dispatch_rx.recv().await {
        match dispatch {
            Dispatch::Open => handler.on_open(stream_id).await,
            Dispatch::Message(payload) => {
                if *closed.borrow() {
                    trace!("data channel {stream_id} closed, dropping message");
                    continue;
                }
                handler.on_message(stream_id, payload).await
            }
            Dispatch::Close => {
                handler.on_close(stream_id).await;
                break;
            }
        }
    }
    trace!("data channel {stream_id} dispatch loop exited");
}
