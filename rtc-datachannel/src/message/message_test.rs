use super::*;
use bytes::{Bytes, BytesMut};

#[test]
fn test_channel_type_unmarshal_success() -> Result<()> {
    let mut bytes = Bytes::from_static(&[0x00]);
    let channel_type = ChannelType::unmarshal(&mut bytes)?;

    assert_eq!(channel_type, ChannelType::Reliable);
    Ok(())
}

#[test]
fn test_channel_type_unmarshal_invalid() {
    let mut bytes = Bytes::from_static(&[0x11]);
    assert_eq!(
        ChannelType::unmarshal(&mut bytes),
        Err(Error::InvalidChannelType(0x11))
    );
}

#[test]
fn test_channel_type_unmarshal_unexpected_end_of_buffer() {
    let mut bytes = Bytes::from_static(&[]);
    assert_eq!(
        ChannelType::unmarshal(&mut bytes),
        Err(Error::UnexpectedEndOfBuffer {
            expected: 1,
            actual: 0
        })
    );
}

#[test]
fn test_channel_type_ordering() {
    assert!(ChannelType::Reliable.is_ordered());
    assert!(ChannelType::PartialReliableTimed.is_ordered());
    assert!(!ChannelType::ReliableUnordered.is_ordered());
    assert!(!ChannelType::PartialReliableRexmitUnordered.is_ordered());
}

#[test]
fn test_channel_type_marshal_size() {
    assert_eq!(ChannelType::PartialReliableTimedUnordered.marshal_size(), 1);
}

#[test]
fn test_channel_type_marshal() -> Result<()> {
    let mut buf = BytesMut::with_capacity(1);
    buf.resize(1, 0u8);
    let bytes_written = ChannelType::PartialReliableRexmitUnordered.marshal_to(&mut buf)?;
    assert_eq!(bytes_written, 1);
    assert_eq!(&buf[..], &[0x81]);
    Ok(())
}

static MARSHALED_BYTES: [u8; 18] = [
    0x03, // message type
    0x00, // channel type
    0x0f, 0x35, // priority
    0x00, 0xff, 0x0f, 0x35, // reliability parameter
    0x00, 0x03, // label length
    0x00, 0x03, // protocol length
    0x66, 0x6f, 0x6f, // label
    0x62, 0x61, 0x72, // protocol
];

#[test]
fn test_message_open_unmarshal() -> Result<()> {
    let mut bytes = Bytes::from_static(&MARSHALED_BYTES);
    let message = Message::unmarshal(&mut bytes)?;

    assert_eq!(
        message,
        Message::DataChannelOpen(DataChannelOpen {
            channel_type: ChannelType::Reliable,
            priority: 3893,
            reliability_parameter: 16715573,
            label: b"foo".to_vec(),
            protocol: b"bar".to_vec(),
        })
    );
    Ok(())
}

#[test]
fn test_message_open_marshal() -> Result<()> {
    let message = Message::DataChannelOpen(DataChannelOpen {
        channel_type: ChannelType::Reliable,
        priority: 3893,
        reliability_parameter: 16715573,
        label: b"foo".to_vec(),
        protocol: b"bar".to_vec(),
    });

    assert_eq!(message.marshal_size(), MARSHALED_BYTES.len());
    assert_eq!(&message.marshal()?[..], &MARSHALED_BYTES[..]);
    Ok(())
}

#[test]
fn test_message_open_truncated_label() {
    let mut bytes = Bytes::copy_from_slice(&MARSHALED_BYTES[..15]);
    assert_eq!(
        Message::unmarshal(&mut bytes),
        Err(Error::UnexpectedEndOfBuffer {
            expected: 6,
            actual: 3
        })
    );
}

#[test]
fn test_message_open_truncated_header() {
    let mut bytes = Bytes::copy_from_slice(&MARSHALED_BYTES[..5]);
    assert_eq!(
        Message::unmarshal(&mut bytes),
        Err(Error::UnexpectedEndOfBuffer {
            expected: 11,
            actual: 4
        })
    );
}

#[test]
fn test_message_ack_round_trip() -> Result<()> {
    let ack = Message::DataChannelAck(DataChannelAck {});
    let raw = ack.marshal()?;
    assert_eq!(&raw[..], &[0x02]);

    let mut bytes = raw.freeze();
    assert_eq!(Message::unmarshal(&mut bytes)?, ack);
    Ok(())
}

#[test]
fn test_message_unknown_type() {
    let mut bytes = Bytes::from_static(&[0x01]);
    assert_eq!(
        Message::unmarshal(&mut bytes),
        Err(Error::InvalidMessageType(0x01))
    );

    let mut empty = Bytes::new();
    assert_eq!(
        Message::unmarshal(&mut empty),
        Err(Error::UnexpectedEndOfBuffer {
            expected: 1,
            actual: 0
        })
    );
}
