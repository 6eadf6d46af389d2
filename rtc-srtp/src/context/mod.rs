
pub mod srtcp;
pub mod srtp;

use crate::cipher::Cipher;
use crate::cipher::cipher_aead_aes_gcm::CipherAeadAesGcm;
use crate::cipher::cipher_aes_cm_hmac_sha1::CipherAesCmHmacSha1;
use crate::config::DEFAULT_MAX_FLOWS;
use crate::option::*;
use crate::protection_profile::ProtectionProfile;

use shared::error::{Error, Result};
use shared::replay_detector::ReplayDetector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Encrypt/Decrypt state for a single SRTP SSRC
pub(crate) struct SrtpSsrcState {
    ssrc: u32,
    /// Highest packet index (ROC << 16 | SEQ) processed on this flow.
    index: u64,
    rollover_has_processed: bool,
    replay_detector: Option<Box<dyn ReplayDetector + Send + 'static>>,
}

/// Encrypt/Decrypt state for a single SRTCP SSRC
pub(crate) struct SrtcpSsrcState {
    ssrc: u32,
    /// Index assigned to the next outbound packet.
    srtcp_index: usize,
    replay_detector: Option<Box<dyn ReplayDetector + Send + 'static>>,
}

impl SrtpSsrcState {
    pub(crate) fn new(
        ssrc: u32,
        replay_detector: Option<Box<dyn ReplayDetector + Send + 'static>>,
    ) -> Self {
        SrtpSsrcState {
            ssrc,
            index: 0,
            rollover_has_processed: false,
            replay_detector,
        }
    }

    /// next_index estimates the 48-bit packet index of `sequence_number`
    /// following RFC 3711 appendix A. Returns None when the estimate falls
    /// outside the index space.
    pub(crate) fn next_index(&self, sequence_number: u16) -> Option<u64> {
        let roc = (self.index >> 16) as i64;
        let seq = sequence_number as i64;

        let guess_roc = if !self.rollover_has_processed {
            roc
        } else {
            let local_seq = (self.index & SEQ_NUM_MAX as u64) as i64;
            let median = SEQ_NUM_MEDIAN as i64;
            if local_seq < median {
                if seq - local_seq > median {
                    roc - 1
                } else {
                    roc
                }
            } else if local_seq - median > seq {
                roc + 1
            } else {
                roc
            }
        };

        if guess_roc < 0 || guess_roc > MAX_ROC as i64 {
            None
        } else {
            Some(((guess_roc as u64) << 16) | sequence_number as u64)
        }
    }

    pub(crate) fn replay_check(&mut self, index: u64) -> bool {
        match &mut self.replay_detector {
            Some(detector) => detector.check(index),
            None => true,
        }
    }

    /// accept commits an authenticated packet index.
    pub(crate) fn accept(&mut self, index: u64) {
        if let Some(detector) = &mut self.replay_detector {
            detector.accept();
        }
        if !self.rollover_has_processed || index > self.index {
            self.index = index;
        }
        self.rollover_has_processed = true;
    }
}

impl SrtcpSsrcState {
    pub(crate) fn new(
        ssrc: u32,
        replay_detector: Option<Box<dyn ReplayDetector + Send + 'static>>,
    ) -> Self {
        SrtcpSsrcState {
            ssrc,
            srtcp_index: 0,
            replay_detector,
        }
    }

    pub(crate) fn replay_check(&mut self, index: usize) -> bool {
        match &mut self.replay_detector {
            Some(detector) => detector.check(index as u64),
            None => true,
        }
    }

    pub(crate) fn accept(&mut self) {
        if let Some(detector) = &mut self.replay_detector {
            detector.accept();
        }
    }
}

/// Outcome of publishing the state of a newly authenticated flow.
pub(crate) enum Published<S> {
    Inserted,
    /// Another caller published the same SSRC first.
    Existing(Arc<Mutex<S>>),
    /// The table already tracks `max_flows` SSRCs.
    Full,
}

/// FlowTable maps SSRC to per-flow state. The map lock is only held for
/// lookups and inserts, packet processing happens under the flow's own lock
/// so distinct flows never contend.
pub(crate) struct FlowTable<S> {
    flows: RwLock<HashMap<u32, Arc<Mutex<S>>>>,
    max_flows: usize,
}

impl<S> FlowTable<S> {
    pub(crate) fn new(max_flows: usize) -> Self {
        FlowTable {
            flows: RwLock::new(HashMap::new()),
            max_flows,
        }
    }

    pub(crate) fn get(&self, ssrc: u32) -> Result<Option<Arc<Mutex<S>>>> {
        let flows = self.flows.read()?;
        Ok(flows.get(&ssrc).cloned())
    }

    /// get_or_insert_with returns the flow, creating it if absent. None if
    /// the flow is absent and the table is full.
    pub(crate) fn get_or_insert_with(
        &self,
        ssrc: u32,
        f: impl FnOnce() -> S,
    ) -> Result<Option<Arc<Mutex<S>>>> {
        if let Some(state) = self.get(ssrc)? {
            return Ok(Some(state));
        }

        let mut flows = self.flows.write()?;
        if let Some(state) = flows.get(&ssrc) {
            return Ok(Some(Arc::clone(state)));
        }
        if flows.len() >= self.max_flows {
            return Ok(None);
        }
        let state = Arc::new(Mutex::new(f()));
        flows.insert(ssrc, Arc::clone(&state));
        Ok(Some(state))
    }

    pub(crate) fn publish(&self, ssrc: u32, state: S) -> Result<Published<S>> {
        let mut flows = self.flows.write()?;
        if let Some(existing) = flows.get(&ssrc) {
            return Ok(Published::Existing(Arc::clone(existing)));
        }
        if flows.len() >= self.max_flows {
            return Ok(Published::Full);
        }
        flows.insert(ssrc, Arc::new(Mutex::new(state)));
        Ok(Published::Inserted)
    }

    pub(crate) fn is_full(&self) -> Result<bool> {
        Ok(self.flows.read()?.len() >= self.max_flows)
    }

    pub(crate) fn len(&self) -> Result<usize> {
        Ok(self.flows.read()?.len())
    }
}

/// Context represents a SRTP cryptographic context.
/// Context can only be used for one-way operations.
/// it must either used ONLY for encryption or ONLY for decryption.
///
/// A Context is shared between tasks: every operation takes `&self` and
/// locks only the flow it touches.
pub struct Context {
    cipher: Box<dyn Cipher>,

    srtp_ssrc_states: FlowTable<SrtpSsrcState>,
    srtcp_ssrc_states: FlowTable<SrtcpSsrcState>,

    new_srtp_replay_detector: ContextOption,
    new_srtcp_replay_detector: ContextOption,
}

impl Context {
    /// CreateContext creates a new SRTP Context
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        profile: ProtectionProfile,
        srtp_ctx_opt: Option<ContextOption>,
        srtcp_ctx_opt: Option<ContextOption>,
    ) -> Result<Context> {
        Self::with_max_flows(
            master_key,
            master_salt,
            profile,
            srtp_ctx_opt,
            srtcp_ctx_opt,
            DEFAULT_MAX_FLOWS,
        )
    }

    /// with_max_flows creates a Context that tracks at most `max_flows`
    /// SSRCs in each direction of RTP and RTCP.
    pub fn with_max_flows(
        master_key: &[u8],
        master_salt: &[u8],
        profile: ProtectionProfile,
        srtp_ctx_opt: Option<ContextOption>,
        srtcp_ctx_opt: Option<ContextOption>,
        max_flows: usize,
    ) -> Result<Context> {
        let key_len = profile.key_len();
        let salt_len = profile.salt_len();

        if master_key.len() != key_len {
            return Err(Error::SrtpMasterKeyLength(key_len, master_key.len()));
        } else if master_salt.len() != salt_len {
            return Err(Error::SrtpSaltLength(salt_len, master_salt.len()));
        }

        let cipher: Box<dyn Cipher> = match profile {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::Aes128CmHmacSha1_32 => {
                Box::new(CipherAesCmHmacSha1::new(profile, master_key, master_salt)?)
            }
            ProtectionProfile::AeadAes128Gcm | ProtectionProfile::AeadAes256Gcm => {
                Box::new(CipherAeadAesGcm::new(profile, master_key, master_salt)?)
            }
        };

        let new_srtp_replay_detector = srtp_ctx_opt.unwrap_or_else(srtp_no_replay_protection);
        let new_srtcp_replay_detector = srtcp_ctx_opt.unwrap_or_else(srtcp_no_replay_protection);

        Ok(Context {
            cipher,
            srtp_ssrc_states: FlowTable::new(max_flows),
            srtcp_ssrc_states: FlowTable::new(max_flows),
            new_srtp_replay_detector,
            new_srtcp_replay_detector,
        })
    }

    fn new_srtp_state(&self, ssrc: u32) -> SrtpSsrcState {
        SrtpSsrcState::new(ssrc, Some((self.new_srtp_replay_detector)()))
    }

    fn new_srtcp_state(&self, ssrc: u32) -> SrtcpSsrcState {
        SrtcpSsrcState::new(ssrc, Some((self.new_srtcp_replay_detector)()))
    }

    /// roc returns SRTP rollover counter value of specified SSRC.
    pub fn roc(&self, ssrc: u32) -> Result<u32> {
        let state = self
            .srtp_ssrc_states
            .get(ssrc)?
            .ok_or(Error::SsrcMissingFromSrtp(ssrc))?;
        let state = state.lock()?;
        Ok((state.index >> 16) as u32)
    }

    /// set_roc sets SRTP rollover counter value of specified SSRC.
    /// The next packet of the flow is processed with this counter.
    pub fn set_roc(&self, ssrc: u32, roc: u32) -> Result<()> {
        let state = self
            .srtp_ssrc_states
            .get_or_insert_with(ssrc, || self.new_srtp_state(ssrc))?
            .ok_or(Error::SsrcMissingFromSrtp(ssrc))?;
        let mut state = state.lock()?;
        state.index = (roc as u64) << 16;
        state.rollover_has_processed = false;
        Ok(())
    }

    /// index returns the SRTCP index assigned to the next packet of the
    /// specified SSRC.
    pub fn index(&self, ssrc: u32) -> Result<usize> {
        let state = self
            .srtcp_ssrc_states
            .get(ssrc)?
            .ok_or(Error::SsrcMissingFromSrtcp(ssrc))?;
        let state = state.lock()?;
        Ok(state.srtcp_index)
    }

    /// set_index sets SRTCP index value of specified SSRC.
    pub fn set_index(&self, ssrc: u32, index: usize) -> Result<()> {
        let state = self
            .srtcp_ssrc_states
            .get_or_insert_with(ssrc, || self.new_srtcp_state(ssrc))?
            .ok_or(Error::SsrcMissingFromSrtcp(ssrc))?;
        let mut state = state.lock()?;
        state.srtcp_index = index % (MAX_SRTCP_INDEX + 1);
        Ok(())
    }

    /// flows returns the number of SRTP and SRTCP flows tracked.
    pub fn flows(&self) -> Result<(usize, usize)> {
        Ok((self.srtp_ssrc_states.len()?, self.srtcp_ssrc_states.len()?))
    }
}
