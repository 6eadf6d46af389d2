use super::*;
use bytes::Bytes;

#[test]
fn test_header_unmarshal_basic() -> Result<()> {
    let raw = Bytes::from_static(&[
        0x90, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda, 0x1c, 0x64, 0x27, 0x82, 0x00, 0x01, 0x00,
        0x01, 0xff, 0xff, 0xff, 0xff, 0x98, 0x36, 0xbe, 0x88, 0x9e,
    ]);
    let mut buf = raw.clone();
    let header = Header::unmarshal(&mut buf)?;

    assert_eq!(header.version, 2);
    assert!(!header.padding);
    assert!(header.extension);
    assert!(header.marker);
    assert_eq!(header.payload_type, 96);
    assert_eq!(header.sequence_number, 27023);
    assert_eq!(header.timestamp, 3653407706);
    assert_eq!(header.ssrc, 476325762);
    assert!(header.csrc.is_empty());
    assert_eq!(header.extension_profile, 1);
    assert_eq!(
        header.extension_payload,
        Bytes::from_static(&[0xff, 0xff, 0xff, 0xff])
    );
    assert_eq!(header.marshal_size(), 20);
    assert_eq!(buf.remaining(), 5, "payload must be left in the buffer");

    let marshaled = header.marshal()?;
    assert_eq!(&marshaled[..], &raw[..20]);

    Ok(())
}

#[test]
fn test_header_with_csrc() -> Result<()> {
    let header = Header {
        version: 2,
        payload_type: 111,
        sequence_number: 65535,
        timestamp: 1,
        ssrc: 0xdeadbeef,
        csrc: vec![1, 2, 3],
        ..Default::default()
    };
    let raw = header.marshal()?;
    assert_eq!(raw.len(), 24);
    assert_eq!(raw[0], 0x83);

    let mut buf = &raw[..];
    let parsed = Header::unmarshal(&mut buf)?;
    assert_eq!(parsed, header);
    Ok(())
}

#[test]
fn test_header_too_short() {
    let mut buf = &[0x80u8, 0x60, 0x00][..];
    assert_eq!(
        Header::unmarshal(&mut buf),
        Err(Error::ErrHeaderSizeInsufficient)
    );

    // CC = 2 but no room for the CSRC list
    let mut buf = &[0x82u8, 0x60, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0][..];
    assert_eq!(
        Header::unmarshal(&mut buf),
        Err(Error::ErrHeaderSizeInsufficient)
    );
}

#[test]
fn test_header_truncated_extension() {
    // X bit set, extension claims two words but carries one
    let mut buf = &[
        0x90u8, 0x60, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0xbe, 0xde, 0x00, 0x02, 1, 2, 3, 4,
    ][..];
    assert_eq!(
        Header::unmarshal(&mut buf),
        Err(Error::ErrHeaderSizeInsufficientForExtension)
    );
}

#[test]
fn test_header_bad_version() {
    let mut buf = &[0x40u8, 0x60, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1][..];
    assert_eq!(Header::unmarshal(&mut buf), Err(Error::BadVersion));
}

#[test]
fn test_header_marshal_rejects_unaligned_extension() {
    let header = Header {
        version: 2,
        extension: true,
        extension_profile: 0xbede,
        extension_payload: Bytes::from_static(&[1, 2, 3]),
        ..Default::default()
    };
    assert_eq!(
        header.marshal(),
        Err(Error::HeaderExtensionPayloadNot32BitWords)
    );
}
