use super::*;

#[test]
fn test_packet_with_padding() -> Result<()> {
    let raw = [
        0xa0u8, 0x60, 0x00, 0x05, 0, 0, 0, 9, 0, 0, 0, 7, 0xaa, 0xbb, 0x00, 0x00, 0x03,
    ];
    let mut buf = &raw[..];
    let packet = Packet::unmarshal(&mut buf)?;
    assert!(packet.header.padding);
    assert_eq!(packet.padding_size, 3);
    assert_eq!(&packet.payload[..], &[0xaa, 0xbb]);

    let marshaled = packet.marshal()?;
    assert_eq!(&marshaled[..], &raw[..]);
    Ok(())
}

#[test]
fn test_packet_invalid_padding() {
    // padding count larger than the payload
    let raw = [0xa0u8, 0x60, 0x00, 0x05, 0, 0, 0, 9, 0, 0, 0, 7, 0xaa, 0x09];
    let mut buf = &raw[..];
    assert_eq!(Packet::unmarshal(&mut buf), Err(Error::WrongPadding));

    // padding bit without any payload
    let raw = [0xa0u8, 0x60, 0x00, 0x05, 0, 0, 0, 9, 0, 0, 0, 7];
    let mut buf = &raw[..];
    assert_eq!(Packet::unmarshal(&mut buf), Err(Error::WrongPadding));
}

#[test]
fn test_packet_display() {
    let packet = Packet {
        header: Header {
            version: 2,
            payload_type: 96,
            sequence_number: 1,
            ssrc: 0x1234,
            ..Default::default()
        },
        payload: Bytes::from_static(b"abc"),
        padding_size: 0,
    };
    let s = packet.to_string();
    assert!(s.contains("Sequence Number: 1"));
    assert!(s.contains("Payload Length: 3"));
}
