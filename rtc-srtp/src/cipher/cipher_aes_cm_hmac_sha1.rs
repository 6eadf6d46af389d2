use super::{Cipher, SRTCP_ENCRYPTION_FLAG, SRTCP_HEADER_LEN};
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

use aes::cipher::{KeyIvInit, StreamCipher};
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};
use hmac::{Hmac, Mac};
use rtp::header::Header;
use sha1::Sha1;
use shared::error::{Error, Result};
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;
type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

pub(crate) struct CipherAesCmHmacSha1 {
    profile: ProtectionProfile,

    srtp_session_key: Vec<u8>,
    srtp_session_salt: Vec<u8>,
    srtp_session_auth: HmacSha1,

    srtcp_session_key: Vec<u8>,
    srtcp_session_salt: Vec<u8>,
    srtcp_session_auth: HmacSha1,
}

impl CipherAesCmHmacSha1 {
    pub(crate) fn new(
        profile: ProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self> {
        let srtp_session_key = aes_cm_key_derivation(
            LABEL_SRTP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            master_key.len(),
        )?;
        let srtcp_session_key = aes_cm_key_derivation(
            LABEL_SRTCP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            master_key.len(),
        )?;

        let srtp_session_salt = aes_cm_key_derivation(
            LABEL_SRTP_SALT,
            master_key,
            master_salt,
            0,
            master_salt.len(),
        )?;
        let srtcp_session_salt = aes_cm_key_derivation(
            LABEL_SRTCP_SALT,
            master_key,
            master_salt,
            0,
            master_salt.len(),
        )?;

        let auth_key_len = profile.auth_key_len();

        let srtp_session_auth_tag = aes_cm_key_derivation(
            LABEL_SRTP_AUTHENTICATION_TAG,
            master_key,
            master_salt,
            0,
            auth_key_len,
        )?;
        let srtcp_session_auth_tag = aes_cm_key_derivation(
            LABEL_SRTCP_AUTHENTICATION_TAG,
            master_key,
            master_salt,
            0,
            auth_key_len,
        )?;

        let srtp_session_auth = HmacSha1::new_from_slice(&srtp_session_auth_tag)
            .map_err(|e| Error::OtherSrtpErr(e.to_string()))?;
        let srtcp_session_auth = HmacSha1::new_from_slice(&srtcp_session_auth_tag)
            .map_err(|e| Error::OtherSrtpErr(e.to_string()))?;

        Ok(CipherAesCmHmacSha1 {
            profile,
            srtp_session_key,
            srtp_session_salt,
            srtp_session_auth,
            srtcp_session_key,
            srtcp_session_salt,
            srtcp_session_auth,
        })
    }

    /// https://tools.ietf.org/html/rfc3711#section-4.2
    /// In the case of SRTP, M SHALL consist of the Authenticated
    /// Portion of the packet (as specified in Figure 1) concatenated with
    /// the ROC, M = Authenticated Portion || ROC;
    ///
    /// The pre-defined authentication transform for SRTP is HMAC-SHA1
    /// [RFC2104].  With HMAC-SHA1, the SRTP_PREFIX_LENGTH (Figure 3) SHALL
    /// be 0.  For SRTP (respectively SRTCP), the HMAC SHALL be applied to
    /// the session authentication key and M as specified above, i.e.,
    /// HMAC(k_a, M).  The HMAC output SHALL then be truncated to the n_tag
    /// left-most bits.
    fn generate_srtp_auth_tag(&self, buf: &[u8], roc: u32) -> Vec<u8> {
        let mut signer = self.srtp_session_auth.clone();
        signer.update(buf);
        signer.update(&roc.to_be_bytes());
        signer.finalize().into_bytes().to_vec()
    }

    /// https://tools.ietf.org/html/rfc3711#section-4.2
    /// For SRTCP, M SHALL consist of the Authenticated Portion
    /// (as specified in Figure 2), i.e. including the E flag and SRTCP index.
    fn generate_srtcp_auth_tag(&self, buf: &[u8]) -> Vec<u8> {
        let mut signer = self.srtcp_session_auth.clone();
        signer.update(buf);
        signer.finalize().into_bytes().to_vec()
    }
}

impl Cipher for CipherAesCmHmacSha1 {
    fn rtp_auth_tag_len(&self) -> usize {
        self.profile.rtp_auth_tag_len()
    }

    fn rtcp_auth_tag_len(&self) -> usize {
        self.profile.rtcp_auth_tag_len()
    }

    fn aead_auth_tag_len(&self) -> usize {
        0
    }

    fn get_rtcp_index(&self, input: &[u8]) -> usize {
        let tail_offset = input.len() - (self.rtcp_auth_tag_len() + SRTCP_INDEX_SIZE);
        (BigEndian::read_u32(&input[tail_offset..tail_offset + SRTCP_INDEX_SIZE]) & !SRTCP_ENCRYPTION_FLAG)
            as usize
    }

    fn encrypt_rtp(
        &self,
        plaintext: &[u8],
        header: &Header,
        header_len: usize,
        roc: u32,
    ) -> Result<BytesMut> {
        let mut writer = BytesMut::with_capacity(plaintext.len() + self.rtp_auth_tag_len());
        writer.extend_from_slice(plaintext);

        // Encrypt the payload
        let counter = generate_counter(
            header.sequence_number,
            roc,
            header.ssrc,
            &self.srtp_session_salt,
        );
        let mut stream = Aes128Ctr::new_from_slices(&self.srtp_session_key, &counter)?;
        stream.apply_keystream(&mut writer[header_len..]);

        // Generate the auth tag over header and encrypted payload
        let auth_tag = self.generate_srtp_auth_tag(&writer, roc);
        writer.extend_from_slice(&auth_tag[..self.rtp_auth_tag_len()]);

        Ok(writer)
    }

    fn decrypt_rtp(
        &self,
        ciphertext: &[u8],
        header: &Header,
        header_len: usize,
        roc: u32,
    ) -> Result<BytesMut> {
        let auth_tag_len = self.rtp_auth_tag_len();
        if ciphertext.len() < header_len + auth_tag_len {
            return Err(Error::SrtpTooSmall(
                ciphertext.len(),
                header_len + auth_tag_len,
            ));
        }

        // Split the auth tag and the cipher text into two parts.
        let actual_tag = &ciphertext[ciphertext.len() - auth_tag_len..];
        let cipher_text = &ciphertext[..ciphertext.len() - auth_tag_len];

        // Generate the auth tag we expect to see from the ciphertext.
        let expected_tag = self.generate_srtp_auth_tag(cipher_text, roc);

        // See if the auth tag actually matches.
        // We use a constant time comparison to prevent timing attacks.
        if actual_tag.ct_eq(&expected_tag[..auth_tag_len]).unwrap_u8() != 1 {
            return Err(Error::ErrFailedToVerifyAuthTag);
        }

        let mut writer = BytesMut::from(cipher_text);
        let counter = generate_counter(
            header.sequence_number,
            roc,
            header.ssrc,
            &self.srtp_session_salt,
        );
        let mut stream = Aes128Ctr::new_from_slices(&self.srtp_session_key, &counter)?;
        stream.apply_keystream(&mut writer[header_len..]);

        Ok(writer)
    }

    fn encrypt_rtcp(&self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<BytesMut> {
        if plaintext.len() < SRTCP_HEADER_LEN {
            return Err(Error::ErrTooShortRtcp);
        }

        let mut writer = BytesMut::with_capacity(
            plaintext.len() + SRTCP_INDEX_SIZE + self.rtcp_auth_tag_len(),
        );
        writer.extend_from_slice(plaintext);

        // Encrypt everything after the header
        let counter = generate_counter(
            (srtcp_index & 0xFFFF) as u16,
            (srtcp_index >> 16) as u32,
            ssrc,
            &self.srtcp_session_salt,
        );
        let mut stream = Aes128Ctr::new_from_slices(&self.srtcp_session_key, &counter)?;
        stream.apply_keystream(&mut writer[SRTCP_HEADER_LEN..]);

        // Add SRTCP index and set Encryption bit
        writer.put_u32(srtcp_index as u32 | SRTCP_ENCRYPTION_FLAG);

        // Generate the auth tag
        let auth_tag = self.generate_srtcp_auth_tag(&writer);
        writer.extend_from_slice(&auth_tag[..self.rtcp_auth_tag_len()]);

        Ok(writer)
    }

    fn decrypt_rtcp(&self, ciphertext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<BytesMut> {
        let auth_tag_len = self.rtcp_auth_tag_len();
        let min_len = SRTCP_HEADER_LEN + SRTCP_INDEX_SIZE + auth_tag_len;
        if ciphertext.len() < min_len {
            return Err(Error::SrtcpTooSmall(ciphertext.len(), min_len));
        }

        let tail_offset = ciphertext.len() - (auth_tag_len + SRTCP_INDEX_SIZE);

        let actual_tag = &ciphertext[ciphertext.len() - auth_tag_len..];
        let authenticated = &ciphertext[..ciphertext.len() - auth_tag_len];

        let expected_tag = self.generate_srtcp_auth_tag(authenticated);
        if actual_tag.ct_eq(&expected_tag[..auth_tag_len]).unwrap_u8() != 1 {
            return Err(Error::ErrFailedToVerifyAuthTag);
        }

        let mut writer = BytesMut::from(&ciphertext[..tail_offset]);

        let is_encrypted = ciphertext[tail_offset] >> 7 != 0;
        if is_encrypted {
            let counter = generate_counter(
                (srtcp_index & 0xFFFF) as u16,
                (srtcp_index >> 16) as u32,
                ssrc,
                &self.srtcp_session_salt,
            );
            let mut stream = Aes128Ctr::new_from_slices(&self.srtcp_session_key, &counter)?;
            stream.apply_keystream(&mut writer[SRTCP_HEADER_LEN..]);
        }

        Ok(writer)
    }
}
