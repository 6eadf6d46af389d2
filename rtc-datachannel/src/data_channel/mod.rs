
use crate::message::{message_channel_ack::*, message_channel_open::*, *};
use crate::payload::{Payload, PayloadProtocolIdentifier};
use bytes::{Buf, BytesMut};
use log::{debug, trace, warn};
use shared::error::{Error, Result};
use shared::marshal::*;
use std::collections::VecDeque;
use std::fmt;

/// DataChannelConfig is used to configure the data channel.
#[derive(Eq, PartialEq, Default, Clone, Debug)]
pub struct DataChannelConfig {
    pub channel_type: ChannelType,
    pub negotiated: bool,
    pub priority: u16,
    pub reliability_parameter: u32,
    pub label: String,
    pub protocol: String,
}

/// DataChannelMessage is a framed message as handed to, or received from,
/// the reliable transport.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataChannelMessage {
    pub stream_id: u16,
    pub ppi: PayloadProtocolIdentifier,
    pub payload: BytesMut,
}

/// DataChannelState is the lifecycle of a data channel.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataChannelState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl fmt::Display for DataChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DataChannelState::Closed => "closed",
            DataChannelState::Opening => "opening",
            DataChannelState::Open => "open",
            DataChannelState::Closing => "closing",
        };
        write!(f, "{s}")
    }
}

/// DataChannelEvent is emitted on lifecycle changes. Each is emitted at most
/// once per channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataChannelEvent {
    Open,
    Close,
}

/// DataChannel represents a data channel
#[derive(Debug, Default, Clone)]
pub struct DataChannel {
    config: DataChannelConfig,
    stream_id: u16,
    state: DataChannelState,

    read_outs: VecDeque<Payload>,
    write_outs: VecDeque<DataChannelMessage>,
    event_outs: VecDeque<DataChannelEvent>,

    open_emitted: bool,
    close_emitted: bool,

    // stats
    messages_sent: usize,
    messages_received: usize,
    bytes_sent: usize,
    bytes_received: usize,
}

impl DataChannel {
    fn new(config: DataChannelConfig, stream_id: u16) -> Self {
        Self {
            config,
            stream_id,
            ..Default::default()
        }
    }

    /// Dial opens a data channel. Unless the channel was negotiated out of
    /// band, a DATA_CHANNEL_OPEN is queued and the channel stays `Opening`
    /// until the peer acknowledges it.
    pub fn dial(config: DataChannelConfig, stream_id: u16) -> Result<Self> {
        let mut data_channel = DataChannel::new(config.clone(), stream_id);

        if config.negotiated {
            data_channel.set_open();
        } else {
            let msg = Message::DataChannelOpen(DataChannelOpen {
                channel_type: config.channel_type,
                priority: config.priority,
                reliability_parameter: config.reliability_parameter,
                label: config.label.bytes().collect(),
                protocol: config.protocol.bytes().collect(),
            })
            .marshal()?;

            data_channel.write_outs.push_back(DataChannelMessage {
                stream_id,
                ppi: PayloadProtocolIdentifier::Dcep,
                payload: msg,
            });
            data_channel.state = DataChannelState::Opening;
        }

        Ok(data_channel)
    }

    /// Accept is used to accept an incoming data channel from the peer's
    /// DATA_CHANNEL_OPEN. The ACK is queued and the channel is `Open`.
    pub fn accept(
        mut config: DataChannelConfig,
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        buf: &[u8],
    ) -> Result<Self> {
        if ppi != PayloadProtocolIdentifier::Dcep {
            return Err(Error::InvalidPayloadProtocolIdentifier(ppi as u8));
        }

        let mut read_buf = buf;
        let msg = Message::unmarshal(&mut read_buf)?;

        match msg {
            Message::DataChannelOpen(dco) => {
                config.channel_type = dco.channel_type;
                config.priority = dco.priority;
                config.reliability_parameter = dco.reliability_parameter;
                config.label = String::from_utf8(dco.label)?;
                config.protocol = String::from_utf8(dco.protocol)?;
            }
            Message::DataChannelAck(_) => {
                return Err(Error::InvalidMessageType(
                    message_type::MESSAGE_TYPE_ACK,
                ));
            }
        };

        let mut data_channel = DataChannel::new(config, stream_id);

        data_channel.write_data_channel_ack()?;
        data_channel.set_open();

        Ok(data_channel)
    }

    /// MessagesSent returns the number of messages sent
    pub fn messages_sent(&self) -> usize {
        self.messages_sent
    }

    /// MessagesReceived returns the number of messages received
    pub fn messages_received(&self) -> usize {
        self.messages_received
    }

    /// BytesSent returns the number of bytes sent
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// BytesReceived returns the number of bytes received
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// StreamIdentifier returns the Stream identifier associated to the stream.
    pub fn stream_identifier(&self) -> u16 {
        self.stream_id
    }

    pub fn config(&self) -> &DataChannelConfig {
        &self.config
    }

    pub fn state(&self) -> DataChannelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DataChannelState::Open
    }

    /// handle_reset is called when the peer reset the stream, or the
    /// transport went away. The channel is `Closed` and pending inbound
    /// messages are discarded.
    pub fn handle_reset(&mut self) {
        if self.state == DataChannelState::Closed && self.close_emitted {
            return;
        }
        debug!("data channel {} reset in state {}", self.stream_id, self.state);
        self.state = DataChannelState::Closed;
        self.read_outs.clear();
        self.write_outs.clear();
        if !self.close_emitted {
            self.close_emitted = true;
            self.event_outs.push_back(DataChannelEvent::Close);
        }
    }

    fn set_open(&mut self) {
        self.state = DataChannelState::Open;
        if !self.open_emitted {
            self.open_emitted = true;
            self.event_outs.push_back(DataChannelEvent::Open);
        }
    }

    fn handle_dcep<B>(&mut self, data: &mut B) -> Result<()>
    where
        B: Buf,
    {
        let msg = Message::unmarshal(data)?;

        match msg {
            Message::DataChannelOpen(_) => {
                // A repeated OPEN on an established stream is acknowledged
                // again so a peer that lost the first ACK can make progress.
                debug!("Received DATA_CHANNEL_OPEN");
                if self.state == DataChannelState::Open {
                    self.write_data_channel_ack()?;
                }
            }
            Message::DataChannelAck(_) => {
                debug!("Received DATA_CHANNEL_ACK");
                if self.state == DataChannelState::Opening {
                    self.set_open();
                }
            }
        };

        Ok(())
    }

    fn write_data_channel_ack(&mut self) -> Result<()> {
        let ack = Message::DataChannelAck(DataChannelAck {}).marshal()?;
        self.write_outs.push_back(DataChannelMessage {
            stream_id: self.stream_id,
            ppi: PayloadProtocolIdentifier::Dcep,
            payload: ack,
        });
        Ok(())
    }
}

impl sansio::Protocol<DataChannelMessage, Payload, ()> for DataChannel {
    type Rout = Payload;
    type Wout = DataChannelMessage;
    type Eout = DataChannelEvent;
    type Error = Error;
    type Time = ();

    /// handle_read takes one message received on this channel's stream.
    /// DCEP messages drive the state machine; user messages are decoded and
    /// surfaced through poll_read while the channel is open.
    fn handle_read(&mut self, msg: DataChannelMessage) -> Result<()> {
        self.messages_received += 1;
        self.bytes_received += msg.payload.len();

        if msg.ppi == PayloadProtocolIdentifier::Dcep {
            let mut data_buf = &msg.payload[..];
            return self.handle_dcep(&mut data_buf);
        }

        if self.state != DataChannelState::Open {
            warn!(
                "data channel {} dropped {} bytes received in state {}",
                self.stream_id,
                msg.payload.len(),
                self.state
            );
            return Ok(());
        }

        trace!(
            "data channel {} received {} ({} bytes)",
            self.stream_id,
            msg.ppi,
            msg.payload.len()
        );
        self.read_outs
            .push_back(Payload::decode(msg.ppi, msg.payload.freeze()));
        Ok(())
    }

    fn poll_read(&mut self) -> Option<Payload> {
        self.read_outs.pop_front()
    }

    /// handle_write frames a payload for this channel's stream.
    fn handle_write(&mut self, payload: Payload) -> Result<()> {
        if self.state != DataChannelState::Open {
            return Err(Error::ErrDataChannelClosed);
        }

        let msg = payload.into_message(self.stream_id)?;
        self.messages_sent += 1;
        self.bytes_sent += msg.payload.len();
        self.write_outs.push_back(msg);

        Ok(())
    }

    /// Returns messages to transmit
    fn poll_write(&mut self) -> Option<DataChannelMessage> {
        self.write_outs.pop_front()
    }

    fn poll_event(&mut self) -> Option<DataChannelEvent> {
        self.event_outs.pop_front()
    }

    /// Close starts closing the channel. It is fully closed by
    /// handle_reset once the stream reset completed.
    fn close(&mut self) -> Result<()> {
        // https://tools.ietf.org/html/draft-ietf-rtcweb-data-channel-13#section-6.7
        // Closing of a data channel MUST be signaled by resetting the
        // corresponding outgoing streams [RFC6525].  This means that if one
        // side decides to close the data channel, it resets the corresponding
        // outgoing stream.  When the peer sees that an incoming stream was
        // reset, it also resets its corresponding outgoing stream.  Once this
        // is completed, the data channel is closed.
        match self.state {
            DataChannelState::Opening | DataChannelState::Open => {
                self.state = DataChannelState::Closing;
            }
            DataChannelState::Closing | DataChannelState::Closed => {}
        }
        Ok(())
    }
}
