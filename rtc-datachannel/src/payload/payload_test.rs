use super::*;

#[test]
fn test_payload_decode_known_codes() {
    let data = Bytes::from_static(b"ping");
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::String, data.clone()),
        Payload::String(data.clone())
    );
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::StringPartial, data.clone()),
        Payload::String(data.clone())
    );
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::Binary, data.clone()),
        Payload::Binary(data.clone())
    );
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::BinaryPartial, data.clone()),
        Payload::Binary(data)
    );
}

#[test]
fn test_payload_decode_empty_codes_ignore_padding_byte() {
    let padding = Bytes::from_static(&[0]);
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::StringEmpty, padding.clone()),
        Payload::String(Bytes::new())
    );
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::BinaryEmpty, padding),
        Payload::Binary(Bytes::new())
    );
}

#[test]
fn test_payload_decode_unknown_code_is_control() {
    for code in [0u32, 49, 55, 58, 1000, u32::MAX] {
        let ppi = PayloadProtocolIdentifier::from(code);
        assert_eq!(ppi, PayloadProtocolIdentifier::Unknown, "code {code}");
        assert_eq!(
            Payload::decode(ppi, Bytes::from_static(b"whatever")),
            Payload::Control
        );
    }
    assert_eq!(
        Payload::decode(PayloadProtocolIdentifier::Dcep, Bytes::from_static(&[0x02])),
        Payload::Control
    );
}

#[test]
fn test_payload_encode() -> Result<()> {
    let (ppi, data) = Payload::from("ping").encode()?;
    assert_eq!(ppi, PayloadProtocolIdentifier::String);
    assert_eq!(&data[..], b"ping");

    let (ppi, data) = Payload::from(vec![1u8, 2, 3]).encode()?;
    assert_eq!(ppi, PayloadProtocolIdentifier::Binary);
    assert_eq!(&data[..], &[1, 2, 3]);

    let (ppi, data) = Payload::from("").encode()?;
    assert_eq!(ppi, PayloadProtocolIdentifier::StringEmpty);
    assert_eq!(&data[..], &[0]);

    let (ppi, data) = Payload::Binary(Bytes::new()).encode()?;
    assert_eq!(ppi, PayloadProtocolIdentifier::BinaryEmpty);
    assert_eq!(&data[..], &[0]);

    assert!(Payload::Control.encode().is_err());
    Ok(())
}

#[test]
fn test_payload_type_agrees_with_decode() -> Result<()> {
    for payload in [
        Payload::from("text"),
        Payload::from(""),
        Payload::from(vec![9u8]),
        Payload::Binary(Bytes::new()),
    ] {
        let (ppi, data) = payload.encode()?;
        assert_eq!(ppi, payload.payload_type());
        assert_eq!(Payload::decode(ppi, data.freeze()), payload);
    }
    Ok(())
}

#[test]
fn test_ppi_display() {
    assert_eq!(PayloadProtocolIdentifier::Dcep.to_string(), "WebRTC DCEP");
    assert_eq!(
        PayloadProtocolIdentifier::from(51).to_string(),
        "WebRTC String"
    );
}

#[test]
fn test_payload_into_message() -> Result<()> {
    let msg = Payload::from("ping").into_message(7)?;
    assert_eq!(msg.stream_id, 7);
    assert_eq!(msg.ppi, PayloadProtocolIdentifier::String);
    assert_eq!(&msg.payload[..], b"ping");

    assert_eq!(
        Payload::Control.into_message(7),
        Err(Error::InvalidPayloadProtocolIdentifier(
            PayloadProtocolIdentifier::Unknown as u8
        ))
    );
    Ok(())
}
