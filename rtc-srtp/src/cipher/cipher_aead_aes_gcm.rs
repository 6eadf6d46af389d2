
use super::{Cipher, SRTCP_ENCRYPTION_FLAG, SRTCP_HEADER_LEN};
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

use aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit, Nonce};
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};
use rtp::header::Header;
use shared::error::{Error, Result};

pub(crate) const CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN: usize = 16;

const RTCP_ENCRYPTION_FLAG: u8 = 0x80;

enum AesGcm {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl AesGcm {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(AesGcm::Aes128(Box::new(Aes128Gcm::new_from_slice(key)?))),
            32 => Ok(AesGcm::Aes256(Box::new(Aes256Gcm::new_from_slice(key)?))),
            n => Err(Error::SrtpMasterKeyLength(16, n)),
        }
    }

    fn seal(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload { msg, aad };
        let sealed = match self {
            AesGcm::Aes128(c) => c.encrypt(nonce, payload)?,
            AesGcm::Aes256(c) => c.encrypt(nonce, payload)?,
        };
        Ok(sealed)
    }

    fn open(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload { msg, aad };
        let opened = match self {
            AesGcm::Aes128(c) => c.decrypt(nonce, payload),
            AesGcm::Aes256(c) => c.decrypt(nonce, payload),
        };
        opened.map_err(|_| Error::ErrFailedToVerifyAuthTag)
    }
}

/// AEAD Cipher based on AES-GCM (RFC 7714).
pub(crate) struct CipherAeadAesGcm {
    profile: ProtectionProfile,
    srtp_cipher: AesGcm,
    srtcp_cipher: AesGcm,
    srtp_session_salt: Vec<u8>,
    srtcp_session_salt: Vec<u8>,
}

impl CipherAeadAesGcm {
    /// Create a new AEAD instance.
    pub(crate) fn new(
        profile: ProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<CipherAeadAesGcm> {
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

        Self::from_session_keys(
            profile,
            &srtp_session_key,
            srtp_session_salt,
            &srtcp_session_key,
            srtcp_session_salt,
        )
    }

    /// from_session_keys builds the cipher from already derived session
    /// keys and 12-octet session salts.
    pub(crate) fn from_session_keys(
        profile: ProtectionProfile,
        srtp_session_key: &[u8],
        srtp_session_salt: Vec<u8>,
        srtcp_session_key: &[u8],
        srtcp_session_salt: Vec<u8>,
    ) -> Result<CipherAeadAesGcm> {
        for salt in [&srtp_session_salt, &srtcp_session_salt] {
            if salt.len() != profile.salt_len() {
                return Err(Error::SrtpSaltLength(profile.salt_len(), salt.len()));
            }
        }

        Ok(CipherAeadAesGcm {
            profile,
            srtp_cipher: AesGcm::new(srtp_session_key)?,
            srtcp_cipher: AesGcm::new(srtcp_session_key)?,
            srtp_session_salt,
            srtcp_session_salt,
        })
    }

    /// The 12-octet IV used by AES-GCM SRTP is formed by first concatenating
    /// 2 octets of zeroes, the 4-octet SSRC, the 4-octet rollover counter
    /// (ROC), and the 2-octet sequence number (SEQ).  The resulting 12-octet
    /// value is then XORed to the 12-octet salt to form the 12-octet IV.
    ///
    /// https://tools.ietf.org/html/rfc7714#section-8.1
    fn rtp_initialization_vector(&self, header: &Header, roc: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        BigEndian::write_u32(&mut iv[2..6], header.ssrc);
        BigEndian::write_u32(&mut iv[6..10], roc);
        BigEndian::write_u16(&mut iv[10..12], header.sequence_number);

        for (i, v) in iv.iter_mut().enumerate() {
            *v ^= self.srtp_session_salt[i];
        }

        iv
    }

    /// The 12-octet IV used by AES-GCM SRTCP is formed by first
    /// concatenating 2 octets of zeroes, the 4-octet SSRC identifier,
    /// 2 octets of zeroes, a single "0" bit, and the 31-bit SRTCP Index.
    /// The resulting 12-octet value is then XORed to the 12-octet salt to
    /// form the 12-octet IV.
    ///
    /// https://tools.ietf.org/html/rfc7714#section-9.1
    fn rtcp_initialization_vector(&self, srtcp_index: usize, ssrc: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        BigEndian::write_u32(&mut iv[2..6], ssrc);
        BigEndian::write_u32(&mut iv[8..12], srtcp_index as u32);

        for (i, v) in iv.iter_mut().enumerate() {
            *v ^= self.srtcp_session_salt[i];
        }

        iv
    }

    /// In an SRTCP packet, a 1-bit Encryption flag is prepended to the
    /// 31-bit SRTCP index to form a 32-bit value we shall call the
    /// "ESRTCP word"
    ///
    /// https://tools.ietf.org/html/rfc7714#section-17
    fn rtcp_additional_authenticated_data(rtcp_header: &[u8], esrtcp_word: &[u8]) -> Vec<u8> {
        let mut aad = Vec::with_capacity(rtcp_header.len() + esrtcp_word.len());
        aad.extend_from_slice(rtcp_header);
        aad.extend_from_slice(esrtcp_word);
        aad
    }
}

impl Cipher for CipherAeadAesGcm {
    fn rtp_auth_tag_len(&self) -> usize {
        self.profile.rtp_auth_tag_len()
    }

    fn rtcp_auth_tag_len(&self) -> usize {
        self.profile.rtcp_auth_tag_len()
    }

    fn aead_auth_tag_len(&self) -> usize {
        CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN
    }

    fn get_rtcp_index(&self, input: &[u8]) -> usize {
        let pos = input.len() - SRTCP_INDEX_SIZE;
        (BigEndian::read_u32(&input[pos..]) & !SRTCP_ENCRYPTION_FLAG) as usize
    }

    fn encrypt_rtp(
        &self,
        plaintext: &[u8],
        header: &Header,
        header_len: usize,
        roc: u32,
    ) -> Result<BytesMut> {
        let nonce = self.rtp_initialization_vector(header, roc);
        let sealed = self
            .srtp_cipher
            .seal(&nonce, &plaintext[header_len..], &plaintext[..header_len])?;

        let mut writer = BytesMut::with_capacity(header_len + sealed.len());
        writer.extend_from_slice(&plaintext[..header_len]);
        writer.extend_from_slice(&sealed);

        Ok(writer)
    }

    fn decrypt_rtp(
        &self,
        ciphertext: &[u8],
        header: &Header,
        header_len: usize,
        roc: u32,
    ) -> Result<BytesMut> {
        let min_len = header_len + self.aead_auth_tag_len();
        if ciphertext.len() < min_len {
            return Err(Error::SrtpTooSmall(ciphertext.len(), min_len));
        }

        let nonce = self.rtp_initialization_vector(header, roc);
        let decrypted = self.srtp_cipher.open(
            &nonce,
            &ciphertext[header_len..],
            &ciphertext[..header_len],
        )?;

        let mut writer = BytesMut::with_capacity(header_len + decrypted.len());
        writer.extend_from_slice(&ciphertext[..header_len]);
        writer.extend_from_slice(&decrypted);

        Ok(writer)
    }

    fn encrypt_rtcp(&self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<BytesMut> {
        if plaintext.len() < SRTCP_HEADER_LEN {
            return Err(Error::ErrTooShortRtcp);
        }

        let esrtcp_word = (srtcp_index as u32 | SRTCP_ENCRYPTION_FLAG).to_be_bytes();
        let iv = self.rtcp_initialization_vector(srtcp_index, ssrc);
        let aad =
            Self::rtcp_additional_authenticated_data(&plaintext[..SRTCP_HEADER_LEN], &esrtcp_word);

        let sealed = self
            .srtcp_cipher
            .seal(&iv, &plaintext[SRTCP_HEADER_LEN..], &aad)?;

        let mut writer =
            BytesMut::with_capacity(SRTCP_HEADER_LEN + sealed.len() + SRTCP_INDEX_SIZE);
        writer.extend_from_slice(&plaintext[..SRTCP_HEADER_LEN]);
        writer.extend_from_slice(&sealed);
        writer.put_slice(&esrtcp_word);

        Ok(writer)
    }

    fn decrypt_rtcp(&self, ciphertext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<BytesMut> {
        let min_len = SRTCP_HEADER_LEN + self.aead_auth_tag_len() + SRTCP_INDEX_SIZE;
        if ciphertext.len() < min_len {
            return Err(Error::SrtcpTooSmall(ciphertext.len(), min_len));
        }

        let tail = ciphertext.len() - SRTCP_INDEX_SIZE;
        let esrtcp_word = &ciphertext[tail..];
        let iv = self.rtcp_initialization_vector(srtcp_index, ssrc);

        if esrtcp_word[0] & RTCP_ENCRYPTION_FLAG != 0 {
            let aad = Self::rtcp_additional_authenticated_data(
                &ciphertext[..SRTCP_HEADER_LEN],
                esrtcp_word,
            );
            let decrypted =
                self.srtcp_cipher
                    .open(&iv, &ciphertext[SRTCP_HEADER_LEN..tail], &aad)?;

            let mut writer = BytesMut::with_capacity(SRTCP_HEADER_LEN + decrypted.len());
            writer.extend_from_slice(&ciphertext[..SRTCP_HEADER_LEN]);
            writer.extend_from_slice(&decrypted);
            Ok(writer)
        } else {
            // Authenticated only: the whole packet is additional data and the
            // tag is the only cipher text.
            let tag_offset = tail - self.aead_auth_tag_len();
            let aad = Self::rtcp_additional_authenticated_data(
                &ciphertext[..tag_offset],
                esrtcp_word,
            );
            self.srtcp_cipher
                .open(&iv, &ciphertext[tag_offset..tail], &aad)?;
            Ok(BytesMut::from(&ciphertext[..tag_offset]))
        }
    }
}
