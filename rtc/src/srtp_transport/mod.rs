
use crate::fingerprint::{FingerprintRegistry, RTCDtlsFingerprint};
use crate::ice_transport::IceConnectionStateNotifier;
use log::{debug, warn};
use shared::crypto::KeyingMaterialExporter;
use shared::error::Result;
use srtp::config::Config;
use srtp::conn::{Conn, SrtpConn};
use srtp::protection_profile::ProtectionProfile;
use std::fmt;
use std::sync::Arc;

/// DTLSRole is the side this endpoint took in the DTLS handshake. It picks
/// which half of the exported keying material protects outbound media.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DTLSRole {
    #[default]
    Client,
    Server,
}

impl fmt::Display for DTLSRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DTLSRole::Client => write!(f, "client"),
            DTLSRole::Server => write!(f, "server"),
        }
    }
}

/// RTCSrtpTransport carries the media of a peer connection once DTLS is
/// done: it checks the peer's certificate, keys SRTP from the handshake and
/// wraps the ICE transport in an [`SrtpConn`].
pub struct RTCSrtpTransport<C: Conn> {
    conn: Arc<SrtpConn<C>>,
    profile: ProtectionProfile,
    dtls_role: DTLSRole,
}

impl<C: Conn + 'static> RTCSrtpTransport<C> {
    /// start verifies `remote_certificate` against the fingerprints the
    /// peer signaled, derives the SRTP master keys through `exporter` and
    /// starts protecting `conn`.
    pub fn start(
        conn: C,
        exporter: &impl KeyingMaterialExporter,
        dtls_role: DTLSRole,
        profile: ProtectionProfile,
        registry: &FingerprintRegistry,
        remote_fingerprints: &[RTCDtlsFingerprint],
        remote_certificate: &[u8],
    ) -> Result<Self> {
        registry.verify(remote_fingerprints, remote_certificate)?;

        let mut config = Config {
            profile,
            ..Default::default()
        };
        config.extract_session_keys_from_dtls(exporter, dtls_role == DTLSRole::Client)?;

        debug!("starting srtp transport as dtls {dtls_role} with {profile}");
        Ok(RTCSrtpTransport {
            conn: Arc::new(SrtpConn::new(conn, config)?),
            profile,
            dtls_role,
        })
    }

    /// attach closes the transport as soon as ICE reports the connection
    /// failed or closed.
    pub async fn attach(&self, notifier: &IceConnectionStateNotifier) {
        let conn = Arc::downgrade(&self.conn);
        notifier
            .on_connection_state_change(Box::new(move |state| {
                let conn = conn.clone();
                Box::pin(async move {
                    if !state.is_terminal() {
                        return;
                    }
                    let Some(conn) = conn.upgrade() else {
                        return;
                    };
                    debug!("ICE connection {state}, closing srtp transport");
                    if let Err(err) = conn.close().await {
                        warn!("failed to close srtp transport: {err}");
                    }
                })
            }))
            .await;
    }

    pub fn conn(&self) -> Arc<SrtpConn<C>> {
        Arc::clone(&self.conn)
    }

    pub fn profile(&self) -> ProtectionProfile {
        self.profile
    }

    pub fn dtls_role(&self) -> DTLSRole {
        self.dtls_role
    }

    pub async fn close(&self) -> Result<()> {
        self.conn.close().await
    }
}
