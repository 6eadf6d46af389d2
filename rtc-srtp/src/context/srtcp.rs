use super::*;
use crate::cipher::SRTCP_HEADER_LEN;
use crate::key_derivation::SRTCP_INDEX_SIZE;

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;
use log::trace;

impl Context {
    fn decrypt_rtcp_with_state(
        &self,
        state: &mut SrtcpSsrcState,
        encrypted: &[u8],
        index: usize,
        ssrc: u32,
    ) -> Result<BytesMut> {
        if !state.replay_check(index) {
            return Err(Error::SrtcpSsrcDuplicated(ssrc, index));
        }

        let decrypted = self.cipher.decrypt_rtcp(encrypted, index, ssrc)?;

        state.accept();

        Ok(decrypted)
    }

    /// DecryptRTCP decrypts a RTCP packet with an encrypted payload
    pub fn decrypt_rtcp(&self, encrypted: &[u8]) -> Result<BytesMut> {
        let min_len = SRTCP_HEADER_LEN
            + SRTCP_INDEX_SIZE
            + self.cipher.rtcp_auth_tag_len()
            + self.cipher.aead_auth_tag_len();
        if encrypted.len() < min_len {
            return Err(Error::SrtcpTooSmall(encrypted.len(), min_len));
        }

        let index = self.cipher.get_rtcp_index(encrypted);
        let ssrc = BigEndian::read_u32(&encrypted[4..8]);

        if let Some(state) = self.srtcp_ssrc_states.get(ssrc)? {
            let mut state = state.lock()?;
            return self.decrypt_rtcp_with_state(&mut state, encrypted, index, ssrc);
        }

        if self.srtcp_ssrc_states.is_full()? {
            return Err(Error::SsrcMissingFromSrtcp(ssrc));
        }

        let mut state = self.new_srtcp_state(ssrc);
        let decrypted = self.decrypt_rtcp_with_state(&mut state, encrypted, index, ssrc)?;

        match self.srtcp_ssrc_states.publish(ssrc, state)? {
            Published::Inserted => {
                trace!("new srtcp flow ssrc={ssrc}");
                Ok(decrypted)
            }
            Published::Existing(existing) => {
                let mut existing = existing.lock()?;
                if !existing.replay_check(index) {
                    return Err(Error::SrtcpSsrcDuplicated(ssrc, index));
                }
                existing.accept();
                Ok(decrypted)
            }
            Published::Full => Err(Error::SsrcMissingFromSrtcp(ssrc)),
        }
    }

    /// EncryptRTCP encrypts a marshaled RTCP packet and appends the SRTCP
    /// index and auth tag.
    pub fn encrypt_rtcp(&self, decrypted: &[u8]) -> Result<BytesMut> {
        if decrypted.len() < SRTCP_HEADER_LEN {
            return Err(Error::SrtcpTooSmall(decrypted.len(), SRTCP_HEADER_LEN));
        }

        let ssrc = BigEndian::read_u32(&decrypted[4..8]);

        let state = self
            .srtcp_ssrc_states
            .get_or_insert_with(ssrc, || self.new_srtcp_state(ssrc))?
            .ok_or(Error::SsrcMissingFromSrtcp(ssrc))?;
        let mut state = state.lock()?;

        let index = state.srtcp_index;
        if index > MAX_SRTCP_INDEX {
            return Err(Error::SrtcpIndexExhausted(index));
        }

        let encrypted = self.cipher.encrypt_rtcp(decrypted, index, ssrc)?;

        state.srtcp_index = index + 1;

        Ok(encrypted)
    }
}
