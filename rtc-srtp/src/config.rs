
use crate::option::ContextOption;
use crate::protection_profile::ProtectionProfile;
use shared::crypto::KeyingMaterialExporter;
use shared::error::{Error, Result};

const LABEL_EXTRACTOR_DTLS_SRTP: &str = "EXTRACTOR-dtls_srtp";

/// DEFAULT_MAX_FLOWS bounds how many distinct SSRCs a remote peer may
/// open in one context.
pub const DEFAULT_MAX_FLOWS: usize = 1024;

/// SessionKeys bundles the keys required to setup an SRTP session
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub local_master_key: Vec<u8>,
    pub local_master_salt: Vec<u8>,
    pub remote_master_key: Vec<u8>,
    pub remote_master_salt: Vec<u8>,
}

/// Config is used to configure a session.
/// You can provide either a KeyingMaterialExporter to export keys
/// or directly pass the keys themselves.
/// After a Config is passed to a session it must not be modified.
pub struct Config {
    pub keys: SessionKeys,
    pub profile: ProtectionProfile,
    /// List of local/remote context options.
    /// ReplayProtection is enabled on remote context by default.
    /// Default replay protection window size is 64.
    pub local_rtp_options: Option<ContextOption>,
    pub remote_rtp_options: Option<ContextOption>,

    pub local_rtcp_options: Option<ContextOption>,
    pub remote_rtcp_options: Option<ContextOption>,

    /// Upper bound on the number of SSRCs tracked per context.
    pub max_flows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            keys: SessionKeys::default(),
            profile: ProtectionProfile::default(),
            local_rtp_options: None,
            remote_rtp_options: None,
            local_rtcp_options: None,
            remote_rtcp_options: None,
            max_flows: DEFAULT_MAX_FLOWS,
        }
    }
}

impl Config {
    /// ExtractSessionKeysFromDTLS allows setting the Config SessionKeys by
    /// extracting them from DTLS. This behavior is defined in RFC5764:
    /// <https://tools.ietf.org/html/rfc5764>
    pub fn extract_session_keys_from_dtls(
        &mut self,
        exporter: &impl KeyingMaterialExporter,
        is_client: bool,
    ) -> Result<()> {
        let key_len = self.profile.key_len();
        let salt_len = self.profile.salt_len();

        let keying_material = exporter.export_keying_material(
            LABEL_EXTRACTOR_DTLS_SRTP,
            &[],
            (key_len * 2) + (salt_len * 2),
        )?;
        if keying_material.len() < (key_len * 2) + (salt_len * 2) {
            return Err(Error::ErrShortSrtpMasterKey);
        }

        let mut offset = 0;
        let client_write_key = keying_material[offset..offset + key_len].to_vec();
        offset += key_len;

        let server_write_key = keying_material[offset..offset + key_len].to_vec();
        offset += key_len;

        let client_write_salt = keying_material[offset..offset + salt_len].to_vec();
        offset += salt_len;

        let server_write_salt = keying_material[offset..offset + salt_len].to_vec();

        if is_client {
            self.keys.local_master_key = client_write_key;
            self.keys.local_master_salt = client_write_salt;
            self.keys.remote_master_key = server_write_key;
            self.keys.remote_master_salt = server_write_salt;
        } else {
            self.keys.local_master_key = server_write_key;
            self.keys.local_master_salt = server_write_salt;
            self.keys.remote_master_key = client_write_key;
            self.keys.remote_master_salt = client_write_salt;
        }

        Ok(())
    }
}
