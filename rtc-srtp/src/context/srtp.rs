use super::*;

use bytes::BytesMut;
use log::trace;
use rtp::header::Header;
use shared::marshal::Unmarshal;

impl Context {
    fn decrypt_rtp_with_state(
        &self,
        state: &mut SrtpSsrcState,
        encrypted: &[u8],
        header: &Header,
        header_len: usize,
    ) -> Result<(BytesMut, u64)> {
        let index = state
            .next_index(header.sequence_number)
            .ok_or(Error::SrtpSsrcDuplicated(header.ssrc, header.sequence_number))?;

        if !state.replay_check(index) {
            return Err(Error::SrtpSsrcDuplicated(
                header.ssrc,
                header.sequence_number,
            ));
        }

        let roc = (index >> 16) as u32;
        let decrypted = self.cipher.decrypt_rtp(encrypted, header, header_len, roc)?;

        state.accept(index);

        Ok((decrypted, index))
    }

    /// DecryptRTP decrypts a RTP packet with an encrypted payload.
    ///
    /// Nothing about the flow changes unless the packet authenticates: an
    /// unknown SSRC is only tracked once its first packet verified.
    pub fn decrypt_rtp(&self, encrypted: &[u8]) -> Result<BytesMut> {
        let mut buf = encrypted;
        let header = Header::unmarshal(&mut buf)?;
        let header_len = encrypted.len() - buf.len();

        if let Some(state) = self.srtp_ssrc_states.get(header.ssrc)? {
            let mut state = state.lock()?;
            let (decrypted, _) =
                self.decrypt_rtp_with_state(&mut state, encrypted, &header, header_len)?;
            return Ok(decrypted);
        }

        if self.srtp_ssrc_states.is_full()? {
            return Err(Error::SsrcMissingFromSrtp(header.ssrc));
        }

        let mut state = self.new_srtp_state(header.ssrc);
        let (decrypted, index) =
            self.decrypt_rtp_with_state(&mut state, encrypted, &header, header_len)?;

        match self.srtp_ssrc_states.publish(header.ssrc, state)? {
            Published::Inserted => {
                trace!("new srtp flow ssrc={}", header.ssrc);
                Ok(decrypted)
            }
            Published::Existing(existing) => {
                let mut existing = existing.lock()?;
                if !existing.replay_check(index) {
                    return Err(Error::SrtpSsrcDuplicated(
                        header.ssrc,
                        header.sequence_number,
                    ));
                }
                existing.accept(index);
                Ok(decrypted)
            }
            Published::Full => Err(Error::SsrcMissingFromSrtp(header.ssrc)),
        }
    }

    /// EncryptRTP encrypts the payload of a marshaled RTP packet and appends
    /// the auth tag.
    ///
    /// The packet index is the sequence number of the packet extended with
    /// the flow's rollover counter, which increments when the sequence
    /// number wraps. Indices must strictly increase per flow: a packet whose
    /// index is not past the last protected one fails with
    /// [`Error::SrtpSsrcDuplicated`], as its keystream was already used.
    pub fn encrypt_rtp(&self, plaintext: &[u8]) -> Result<BytesMut> {
        let mut buf = plaintext;
        let header = Header::unmarshal(&mut buf)?;
        let header_len = plaintext.len() - buf.len();

        let state = self
            .srtp_ssrc_states
            .get_or_insert_with(header.ssrc, || self.new_srtp_state(header.ssrc))?
            .ok_or(Error::SsrcMissingFromSrtp(header.ssrc))?;
        let mut state = state.lock()?;

        let index = state.next_index(header.sequence_number).ok_or_else(|| {
            Error::OtherSrtpErr(format!(
                "ssrc {} sequence number {} is outside the packet index space",
                header.ssrc, header.sequence_number
            ))
        })?;
        if state.rollover_has_processed && index <= state.index {
            return Err(Error::SrtpSsrcDuplicated(
                header.ssrc,
                header.sequence_number,
            ));
        }
        let roc = (index >> 16) as u32;

        let encrypted = self
            .cipher
            .encrypt_rtp(plaintext, &header, header_len, roc)?;

        state.accept(index);

        Ok(encrypted)
    }
}
