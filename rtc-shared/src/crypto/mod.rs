use crate::error::Result;

/// KeyingMaterialExporter exports keying material from a completed
/// security handshake (RFC 5705).
///
/// The SRTP layer only consumes the exported bytes, so the handshake
/// implementation stays behind this trait.
pub trait KeyingMaterialExporter {
    fn export_keying_material(&self, label: &str, context: &[u8], length: usize)
    -> Result<Vec<u8>>;
}
