#[cfg(test)]
mod payload_test;

use crate::data_channel::DataChannelMessage;
use bytes::{Bytes, BytesMut};
use shared::error::{Error, Result};
use std::fmt;

/// PayloadProtocolIdentifier is the SCTP payload protocol identifier that
/// tags every data channel message on the wire.
///
/// <https://www.iana.org/assignments/sctp-parameters/sctp-parameters.xhtml#sctp-parameters-25>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub enum PayloadProtocolIdentifier {
    Dcep = 50,
    String = 51,
    BinaryPartial = 52,
    Binary = 53,
    StringPartial = 54,
    StringEmpty = 56,
    BinaryEmpty = 57,
    #[default]
    Unknown,
}

impl fmt::Display for PayloadProtocolIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PayloadProtocolIdentifier::Dcep => "WebRTC DCEP",
            PayloadProtocolIdentifier::String => "WebRTC String",
            PayloadProtocolIdentifier::BinaryPartial => "WebRTC Binary Partial",
            PayloadProtocolIdentifier::Binary => "WebRTC Binary",
            PayloadProtocolIdentifier::StringPartial => "WebRTC String Partial",
            PayloadProtocolIdentifier::StringEmpty => "WebRTC String (Empty)",
            PayloadProtocolIdentifier::BinaryEmpty => "WebRTC Binary (Empty)",
            _ => "Unknown Payload Protocol Identifier",
        };
        write!(f, "{s}")
    }
}

impl From<u32> for PayloadProtocolIdentifier {
    fn from(v: u32) -> PayloadProtocolIdentifier {
        match v {
            50 => PayloadProtocolIdentifier::Dcep,
            51 => PayloadProtocolIdentifier::String,
            52 => PayloadProtocolIdentifier::BinaryPartial,
            53 => PayloadProtocolIdentifier::Binary,
            54 => PayloadProtocolIdentifier::StringPartial,
            56 => PayloadProtocolIdentifier::StringEmpty,
            57 => PayloadProtocolIdentifier::BinaryEmpty,
            _ => PayloadProtocolIdentifier::Unknown,
        }
    }
}

/// Payload is a typed data channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text. The bytes are passed through as received.
    String(Bytes),
    Binary(Bytes),
    /// No content: protocol control traffic or a type this side does not
    /// understand.
    Control,
}

impl Payload {
    /// decode maps a wire type code and its bytes to a payload. It never
    /// fails: codes without a known variant decode to [`Payload::Control`].
    pub fn decode(ppi: PayloadProtocolIdentifier, data: Bytes) -> Self {
        match ppi {
            PayloadProtocolIdentifier::String | PayloadProtocolIdentifier::StringPartial => {
                Payload::String(data)
            }
            PayloadProtocolIdentifier::Binary | PayloadProtocolIdentifier::BinaryPartial => {
                Payload::Binary(data)
            }
            // the single zero byte carried by empty messages is ignored
            PayloadProtocolIdentifier::StringEmpty => Payload::String(Bytes::new()),
            PayloadProtocolIdentifier::BinaryEmpty => Payload::Binary(Bytes::new()),
            PayloadProtocolIdentifier::Dcep | PayloadProtocolIdentifier::Unknown => {
                Payload::Control
            }
        }
    }

    /// payload_type is the wire type code this payload is sent with.
    pub fn payload_type(&self) -> PayloadProtocolIdentifier {
        match self {
            Payload::String(data) if data.is_empty() => PayloadProtocolIdentifier::StringEmpty,
            Payload::String(_) => PayloadProtocolIdentifier::String,
            Payload::Binary(data) if data.is_empty() => PayloadProtocolIdentifier::BinaryEmpty,
            Payload::Binary(_) => PayloadProtocolIdentifier::Binary,
            Payload::Control => PayloadProtocolIdentifier::Unknown,
        }
    }

    /// encode returns the wire type code and bytes for this payload.
    ///
    /// <https://tools.ietf.org/html/draft-ietf-rtcweb-data-channel-12#section-6.6>
    /// SCTP does not support the sending of empty user messages.  Therefore,
    /// if an empty message has to be sent, the appropriate PPID (WebRTC
    /// String Empty or WebRTC Binary Empty) is used and the SCTP user
    /// message of one zero byte is sent.
    pub fn encode(&self) -> Result<(PayloadProtocolIdentifier, BytesMut)> {
        let ppi = self.payload_type();
        match self {
            Payload::String(data) | Payload::Binary(data) => {
                if data.is_empty() {
                    Ok((ppi, BytesMut::from(&[0][..])))
                } else {
                    Ok((ppi, BytesMut::from(&data[..])))
                }
            }
            Payload::Control => Err(Error::InvalidPayloadProtocolIdentifier(ppi as u8)),
        }
    }

    /// into_message frames the payload for the given stream.
    pub fn into_message(self, stream_id: u16) -> Result<DataChannelMessage> {
        let (ppi, payload) = self.encode()?;
        Ok(DataChannelMessage {
            stream_id,
            ppi,
            payload,
        })
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Payload::String(_))
    }

    /// data returns the content, empty for [`Payload::Control`].
    pub fn data(&self) -> &[u8] {
        match self {
            Payload::String(data) | Payload::Binary(data) => data,
            Payload::Control => &[],
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::String(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::String(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(v))
    }
}
