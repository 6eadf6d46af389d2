pub(crate) mod cipher_aead_aes_gcm;
pub(crate) mod cipher_aes_cm_hmac_sha1;

use bytes::BytesMut;
use rtp::header::Header;
use shared::error::Result;

pub(crate) const SRTCP_HEADER_LEN: usize = 8;
pub(crate) const SRTCP_ENCRYPTION_FLAG: u32 = 0x8000_0000;

/// Cipher represents a implementation of one
/// SRTP specific encryption scheme.
///
/// Session keys are derived once at construction and never change, so a
/// cipher is shared by every flow of a context.
pub(crate) trait Cipher: Send + Sync {
    /// Get RTP authenticated tag length.
    fn rtp_auth_tag_len(&self) -> usize;

    /// Get RTCP authenticated tag length.
    fn rtcp_auth_tag_len(&self) -> usize;

    /// Get AEAD auth key length of the cipher.
    fn aead_auth_tag_len(&self) -> usize;

    /// Retrieved RTCP index. Callers make sure the input holds the full trailer.
    fn get_rtcp_index(&self, input: &[u8]) -> usize;

    /// Encrypt RTP payload.
    fn encrypt_rtp(
        &self,
        plaintext: &[u8],
        header: &Header,
        header_len: usize,
        roc: u32,
    ) -> Result<BytesMut>;

    /// Decrypt RTP payload. The tag is verified before anything is decrypted.
    fn decrypt_rtp(
        &self,
        ciphertext: &[u8],
        header: &Header,
        header_len: usize,
        roc: u32,
    ) -> Result<BytesMut>;

    /// Encrypt RTCP payload.
    fn encrypt_rtcp(&self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<BytesMut>;

    /// Decrypt RTCP payload.
    fn decrypt_rtcp(&self, ciphertext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<BytesMut>;
}
