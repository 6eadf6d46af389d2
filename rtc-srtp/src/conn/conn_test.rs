use super::pipe::{PipeConn, pipe};
use super::udp::UdpConn;
use super::*;
use crate::config::SessionKeys;
use crate::protection_profile::ProtectionProfile;

use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

const KEY_A: [u8; 16] = [
    0xe1, 0xf9, 0x7a, 0x0d, 0x3e, 0x01, 0x8b, 0xe0, 0xd6, 0x4f, 0xa3, 0x2c, 0x06, 0xde, 0x41, 0x39,
];
const SALT_A: [u8; 14] = [
    0x0e, 0xc6, 0x75, 0xad, 0x49, 0x8a, 0xfe, 0xeb, 0xb6, 0x96, 0x0b, 0x3a, 0xab, 0xe6,
];
const KEY_B: [u8; 16] = [
    0x0d, 0xcd, 0x21, 0x3e, 0x4c, 0xbc, 0xf2, 0x8f, 0x01, 0x7f, 0x69, 0x94, 0x40, 0x1e, 0x28, 0x89,
];
const SALT_B: [u8; 14] = [
    0x62, 0x77, 0x60, 0x38, 0xc0, 0x6d, 0xc9, 0x41, 0x9f, 0x6d, 0xd9, 0x43, 0x3e, 0x7c,
];

// RTP, payload type 96, seq 1, ssrc 0xcafebabe
const RTP_PACKET: [u8; 17] = [
    0x80, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0xca, 0xfe, 0xba, 0xbe, 0x01, 0x02, 0x03,
    0x04, 0x05,
];
// RTCP receiver report, ssrc 0xcafebabe
const RTCP_PACKET: [u8; 8] = [0x80, 0xc9, 0x00, 0x01, 0xca, 0xfe, 0xba, 0xbe];

fn config(local_key: &[u8], local_salt: &[u8], remote_key: &[u8], remote_salt: &[u8]) -> Config {
    Config {
        keys: SessionKeys {
            local_master_key: local_key.to_vec(),
            local_master_salt: local_salt.to_vec(),
            remote_master_key: remote_key.to_vec(),
            remote_master_salt: remote_salt.to_vec(),
        },
        profile: ProtectionProfile::Aes128CmHmacSha1_80,
        ..Default::default()
    }
}

fn conn_pair() -> Result<(SrtpConn<PipeConn>, SrtpConn<PipeConn>)> {
    let (a, b) = pipe();
    let client = SrtpConn::new(a, config(&KEY_A, &SALT_A, &KEY_B, &SALT_B))?;
    let server = SrtpConn::new(b, config(&KEY_B, &SALT_B, &KEY_A, &SALT_A))?;
    Ok((client, server))
}

/// raw_peer returns a conn reading with key A plus the bare other end of
/// its transport and a context protecting with key A.
fn raw_peer() -> Result<(SrtpConn<PipeConn>, PipeConn, Context)> {
    let (a, b) = pipe();
    let conn = SrtpConn::new(a, config(&KEY_B, &SALT_B, &KEY_A, &SALT_A))?;
    let context = Context::new(
        &KEY_A,
        &SALT_A,
        ProtectionProfile::Aes128CmHmacSha1_80,
        None,
        None,
    )?;
    Ok((conn, b, context))
}

#[tokio::test]
async fn test_srtp_conn_round_trip() -> Result<()> {
    let (client, server) = conn_pair()?;

    assert_eq!(client.write(&RTP_PACKET).await?, RTP_PACKET.len());
    assert_eq!(client.write(&RTCP_PACKET).await?, RTCP_PACKET.len());

    let mut buf = vec![0u8; RECEIVE_MTU];
    let n = server.read(&mut buf).await?;
    assert_eq!(&buf[..n], &RTP_PACKET[..]);
    let n = server.read(&mut buf).await?;
    assert_eq!(&buf[..n], &RTCP_PACKET[..]);

    assert_eq!(client.stats().packets_written, 2);
    assert_eq!(server.stats().packets_read, 2);
    assert_eq!(server.remote_context().roc(0xcafe_babe)?, 0);

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_discards_other_traffic() -> Result<()> {
    let (conn, raw, context) = raw_peer()?;

    // STUN binding request, DTLS record, TURN channel data, empty datagram
    raw.send(&[0x00, 0x01, 0x00, 0x00]).await?;
    raw.send(&[22, 0xfe, 0xfd, 0x00]).await?;
    raw.send(&[0x40, 0x00, 0x00, 0x00]).await?;
    raw.send(&[]).await?;
    raw.send(&context.encrypt_rtp(&RTP_PACKET)?).await?;

    let mut buf = vec![0u8; RECEIVE_MTU];
    let n = conn.read(&mut buf).await?;
    assert_eq!(&buf[..n], &RTP_PACKET[..]);
    assert_eq!(conn.stats().other_dropped, 4);

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_discards_replayed_and_forged_packets() -> Result<()> {
    let (conn, raw, context) = raw_peer()?;

    let first = context.encrypt_rtp(&RTP_PACKET)?;
    let mut second_plain = RTP_PACKET;
    second_plain[3] = 0x02;
    let second = context.encrypt_rtp(&second_plain)?;
    let mut forged = second.clone();
    forged[14] ^= 0xff;

    raw.send(&first).await?;
    raw.send(&first).await?;
    raw.send(&forged).await?;
    raw.send(&second).await?;

    let mut buf = vec![0u8; RECEIVE_MTU];
    let n = conn.read(&mut buf).await?;
    assert_eq!(&buf[..n], &RTP_PACKET[..]);
    let n = conn.read(&mut buf).await?;
    assert_eq!(&buf[..n], &second_plain[..]);
    assert_eq!(conn.stats().unprotect_dropped, 2);

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_buffer_short() -> Result<()> {
    let (client, server) = conn_pair()?;
    client.write(&RTP_PACKET).await?;

    let mut buf = [0u8; 4];
    assert_eq!(server.read(&mut buf).await, Err(Error::ErrBufferShort));
    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_close_unblocks_read() -> Result<()> {
    env_logger::builder().is_test(true).try_init().ok();

    let (_client, server) = conn_pair()?;
    let server = Arc::new(server);

    let reader = Arc::clone(&server);
    let pending = tokio::spawn(async move {
        let mut buf = vec![0u8; RECEIVE_MTU];
        reader.read(&mut buf).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    server.close().await?;

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .map_err(|e| Error::Other(e.to_string()))?;
    assert_eq!(result, Err(Error::ErrConnClosed));

    // closing again is fine, later calls fail immediately
    server.close().await?;
    let mut buf = vec![0u8; RECEIVE_MTU];
    assert_eq!(server.read(&mut buf).await, Err(Error::ErrConnClosed));
    assert_eq!(server.write(&RTP_PACKET).await, Err(Error::ErrConnClosed));

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_read_deadline() -> Result<()> {
    let (client, server) = conn_pair()?;
    let mut buf = vec![0u8; RECEIVE_MTU];

    server.set_read_deadline(Some(Instant::now() + Duration::from_millis(30)));
    assert_eq!(server.read(&mut buf).await, Err(Error::ErrDeadlineExceeded));

    // a deadline in the past fails at once
    server.set_read_deadline(Some(Instant::now() - Duration::from_millis(1)));
    assert_eq!(server.read(&mut buf).await, Err(Error::ErrDeadlineExceeded));

    // clearing the deadline makes reads block for data again
    server.set_read_deadline(None);
    assert_eq!(server.read_deadline(), None);
    client.write(&RTP_PACKET).await?;
    let n = server.read(&mut buf).await?;
    assert_eq!(&buf[..n], &RTP_PACKET[..]);

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_deadline_moved_while_blocked() -> Result<()> {
    let (_client, server) = conn_pair()?;
    let server = Arc::new(server);
    server.set_read_deadline(Some(Instant::now() + Duration::from_secs(3600)));

    let reader = Arc::clone(&server);
    let pending = tokio::spawn(async move {
        let mut buf = vec![0u8; RECEIVE_MTU];
        reader.read(&mut buf).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    server.set_deadline(Some(Instant::now()));

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .map_err(|e| Error::Other(e.to_string()))?;
    assert_eq!(result, Err(Error::ErrDeadlineExceeded));
    assert!(server.write_deadline().is_some());

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_write_rejects_garbage() -> Result<()> {
    let (client, _server) = conn_pair()?;
    assert_eq!(
        client.write(&[0x80, 0x60]).await,
        Err(Error::ErrHeaderSizeInsufficient)
    );
    assert_eq!(client.stats().packets_written, 0);
    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_addrs_over_udp() -> Result<()> {
    let a = UdpSocket::bind("127.0.0.1:0").await?;
    let b = UdpSocket::bind("127.0.0.1:0").await?;
    a.connect(b.local_addr()?).await?;
    b.connect(a.local_addr()?).await?;
    let a_addr = a.local_addr()?;
    let b_addr = b.local_addr()?;

    let client = SrtpConn::new(UdpConn::new(a), config(&KEY_A, &SALT_A, &KEY_B, &SALT_B))?;
    let server = SrtpConn::new(UdpConn::new(b), config(&KEY_B, &SALT_B, &KEY_A, &SALT_A))?;
    assert_eq!(client.local_addr(), Some(a_addr));
    assert_eq!(client.remote_addr(), Some(b_addr));

    client.write(&RTP_PACKET).await?;
    let mut buf = vec![0u8; RECEIVE_MTU];
    let n = server.read(&mut buf).await?;
    assert_eq!(&buf[..n], &RTP_PACKET[..]);

    Ok(())
}

#[tokio::test]
async fn test_srtp_conn_close_releases_udp_socket() -> Result<()> {
    let a = UdpSocket::bind("127.0.0.1:0").await?;
    let b = UdpSocket::bind("127.0.0.1:0").await?;
    a.connect(b.local_addr()?).await?;
    let a_addr = a.local_addr()?;

    let client = Arc::new(SrtpConn::new(
        UdpConn::new(a),
        config(&KEY_A, &SALT_A, &KEY_B, &SALT_B),
    )?);

    let reader = Arc::clone(&client);
    let pending = tokio::spawn(async move {
        let mut buf = vec![0u8; RECEIVE_MTU];
        reader.read(&mut buf).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    client.close().await?;
    assert_eq!(client.local_addr(), None);
    assert_eq!(client.remote_addr(), None);

    // the address is free again while the conn itself is still alive
    let rebound = UdpSocket::bind(a_addr).await?;
    assert_eq!(rebound.local_addr()?, a_addr);

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .map_err(|e| Error::Other(e.to_string()))?;
    assert_eq!(result, Err(Error::ErrConnClosed));
    assert_eq!(client.write(&RTP_PACKET).await, Err(Error::ErrConnClosed));

    Ok(())
}

#[tokio::test]
async fn test_udp_conn_close() -> Result<()> {
    let a = UdpSocket::bind("127.0.0.1:0").await?;
    let b = UdpSocket::bind("127.0.0.1:0").await?;
    a.connect(b.local_addr()?).await?;
    let a_addr = a.local_addr()?;
    let conn = Arc::new(UdpConn::from(a));
    assert_eq!(conn.local_addr(), Some(a_addr));
    assert_eq!(conn.remote_addr(), Some(b.local_addr()?));

    let receiver = Arc::clone(&conn);
    let pending = tokio::spawn(async move {
        let mut buf = vec![0u8; RECEIVE_MTU];
        receiver.recv(&mut buf).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    conn.close().await?;
    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .map_err(|e| Error::Other(e.to_string()))?;
    assert_eq!(result, Err(Error::ErrConnClosed));

    assert_eq!(conn.send(&[0x80]).await, Err(Error::ErrConnClosed));
    assert_eq!(conn.local_addr(), None);
    UdpSocket::bind(a_addr).await?;
    Ok(())
}
