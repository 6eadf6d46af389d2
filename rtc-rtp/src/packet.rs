#[cfg(test)]
mod packet_test;

use crate::header::Header;
use bytes::{Buf, BufMut, Bytes};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};
use std::fmt;

/// Packet represents an RTP Packet
/// NOTE: Raw is populated by Marshal/Unmarshal and should not be modified
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
    /// Number of padding octets, including the trailing count octet.
    pub padding_size: u8,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = "RTP PACKET:\n".to_string();

        out += format!("\tVersion: {}\n", self.header.version).as_str();
        out += format!("\tMarker: {}\n", self.header.marker).as_str();
        out += format!("\tPayload Type: {}\n", self.header.payload_type).as_str();
        out += format!("\tSequence Number: {}\n", self.header.sequence_number).as_str();
        out += format!("\tTimestamp: {}\n", self.header.timestamp).as_str();
        out += format!("\tSSRC: {} ({:x})\n", self.header.ssrc, self.header.ssrc).as_str();
        out += format!("\tPayload Length: {}\n", self.payload.len()).as_str();

        write!(f, "{out}")
    }
}

impl Unmarshal for Packet {
    /// Unmarshal parses the passed byte slice and stores the result in the Packet.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;
        let payload_len = raw_packet.remaining();
        let (payload, padding_size) = if header.padding {
            if payload_len == 0 {
                return Err(Error::WrongPadding);
            }
            let mut payload = raw_packet.copy_to_bytes(payload_len);
            let padding_size = payload[payload_len - 1];
            if padding_size == 0 || padding_size as usize > payload_len {
                return Err(Error::WrongPadding);
            }
            payload.truncate(payload_len - padding_size as usize);
            (payload, padding_size)
        } else {
            (raw_packet.copy_to_bytes(payload_len), 0)
        };

        Ok(Packet {
            header,
            payload,
            padding_size,
        })
    }
}

impl MarshalSize for Packet {
    /// MarshalSize returns the size of the packet once marshaled.
    fn marshal_size(&self) -> usize {
        let padding = if self.header.padding {
            self.padding_size as usize
        } else {
            0
        };
        self.header.marshal_size() + self.payload.len() + padding
    }
}

impl Marshal for Packet {
    /// MarshalTo serializes the packet and writes to the buffer.
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        if self.header.padding && self.padding_size == 0 {
            return Err(Error::WrongPadding);
        }
        if buf.remaining_mut() < self.marshal_size() {
            return Err(Error::ErrBufferTooSmall);
        }

        let n = self.header.marshal_to(buf)?;
        buf = &mut buf[n..];
        buf.put_slice(&self.payload);

        if self.header.padding {
            let padding_size = self.padding_size as usize;
            for _ in 0..padding_size - 1 {
                buf.put_u8(0);
            }
            buf.put_u8(self.padding_size);
        }

        Ok(self.marshal_size())
    }
}
