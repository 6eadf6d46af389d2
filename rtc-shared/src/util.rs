
use std::fmt;

/// match_range accepts packets with the first byte in [lower..=upper].
/// An empty packet never matches.
fn match_range(lower: u8, upper: u8, buf: &[u8]) -> bool {
    match buf.first() {
        Some(&b) => b >= lower && b <= upper,
        None => false,
    }
}

/// MatchFuncs as described in RFC7983
/// <https://tools.ietf.org/html/rfc7983>
///              +----------------+
///              |        [0..3] -+--> forward to STUN
///              |                |
///              |      [16..19] -+--> forward to ZRTP
///              |                |
///  packet -->  |      [20..63] -+--> forward to DTLS
///              |                |
///              |      [64..79] -+--> forward to TURN Channel
///              |                |
///              |    [128..191] -+--> forward to RTP/RTCP
///              +----------------+
/// match_stun accepts packets with the first byte in [0..3]
pub fn match_stun(b: &[u8]) -> bool {
    match_range(0, 3, b)
}

/// match_zrtp accepts packets with the first byte in [16..19]
pub fn match_zrtp(b: &[u8]) -> bool {
    match_range(16, 19, b)
}

/// match_dtls accepts packets with the first byte in [20..63]
pub fn match_dtls(b: &[u8]) -> bool {
    match_range(20, 63, b)
}

/// match_turn_channel accepts packets with the first byte in [64..79]
pub fn match_turn_channel(b: &[u8]) -> bool {
    match_range(64, 79, b)
}

/// match_srtp_or_srtcp accepts packets with the first byte in [128..191]
pub fn match_srtp_or_srtcp(b: &[u8]) -> bool {
    match_range(128, 191, b)
}

pub fn is_rtcp(buf: &[u8]) -> bool {
    // Not long enough to determine RTP/RTCP
    if buf.len() < 4 {
        return false;
    }

    let rtcp_packet_type = buf[1];
    (192..=223).contains(&rtcp_packet_type)
}

/// match_srtp only matches SRTP and not SRTCP
pub fn match_srtp(buf: &[u8]) -> bool {
    match_srtp_or_srtcp(buf) && !is_rtcp(buf)
}

/// match_srtcp only matches SRTCP and not SRTP
pub fn match_srtcp(buf: &[u8]) -> bool {
    match_srtp_or_srtcp(buf) && is_rtcp(buf)
}

/// PacketClass tags a datagram received on a shared transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketClass {
    /// SRTP or SRTCP, handled by the media protection layer.
    ProtectedMedia,
    /// Anything else (STUN, DTLS, TURN channel data, ...), which the caller
    /// must route elsewhere.
    Other,
}

impl fmt::Display for PacketClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PacketClass::ProtectedMedia => "ProtectedMedia",
            PacketClass::Other => "Other",
        };
        write!(f, "{s}")
    }
}

/// classify inspects only the first octet of a complete datagram.
pub fn classify(datagram: &[u8]) -> PacketClass {
    if match_srtp_or_srtcp(datagram) {
        PacketClass::ProtectedMedia
    } else {
        PacketClass::Other
    }
}

/// protocol_name names the RFC 7983 range a datagram falls into, for logging.
pub fn protocol_name(datagram: &[u8]) -> &'static str {
    if datagram.is_empty() {
        "empty"
    } else if match_stun(datagram) {
        "stun"
    } else if match_zrtp(datagram) {
        "zrtp"
    } else if match_dtls(datagram) {
        "dtls"
    } else if match_turn_channel(datagram) {
        "turn-channel"
    } else if match_srtcp(datagram) {
        "srtcp"
    } else if match_srtp(datagram) {
        "srtp"
    } else {
        "unknown"
    }
}
