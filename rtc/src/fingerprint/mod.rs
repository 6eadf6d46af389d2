#[cfg(test)]
mod fingerprint_test;

use log::debug;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use shared::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use unicase::UniCase;

/// HashFunction digests a DER encoded certificate.
pub type HashFunction = fn(&[u8]) -> Vec<u8>;

fn hash<D: Digest>(certificate: &[u8]) -> Vec<u8> {
    D::digest(certificate).to_vec()
}

/// DTLS certificate fingerprint as exchanged in the SDP `a=fingerprint`
/// attribute.
///
/// The value is the colon-separated lowercase hex of the certificate digest,
/// for example `"ab:cd:ef:01:..."`.
///
/// # Specifications
///
/// - [RFC 4572] - Connection-Oriented Media Transport over TLS
/// - [RFC 8122] - Updates to RFC 4572
///
/// [RFC 4572]: https://datatracker.ietf.org/doc/html/rfc4572
/// [RFC 8122]: https://datatracker.ietf.org/doc/html/rfc8122
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    /// Hash function algorithm name from the 'Hash function Textual Names'
    /// registry, e.g. `"sha-256"`. Case-insensitive.
    pub algorithm: String,
    /// Certificate fingerprint value.
    pub value: String,
}

impl fmt::Display for RTCDtlsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.value)
    }
}

impl TryFrom<&str> for RTCDtlsFingerprint {
    type Error = Error;

    /// Parses the attribute value form `"<algorithm> <value>"`.
    fn try_from(raw: &str) -> Result<Self> {
        let mut fields = raw.split_whitespace();
        let (Some(algorithm), Some(value), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::ErrInvalidFingerprint);
        };

        if !value.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(Error::ErrInvalidFingerprint);
        }

        Ok(RTCDtlsFingerprint {
            algorithm: algorithm.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// FingerprintRegistryBuilder collects the hash functions available to a
/// [`FingerprintRegistry`].
#[derive(Default, Clone)]
pub struct FingerprintRegistryBuilder {
    algorithms: HashMap<UniCase<String>, HashFunction>,
}

impl FingerprintRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// register adds a hash function under the given name. Names are
    /// compared case-insensitively and must be unique.
    pub fn register(mut self, algorithm: &str, hash_function: HashFunction) -> Result<Self> {
        let name = UniCase::new(algorithm.to_owned());
        if self.algorithms.contains_key(&name) {
            return Err(Error::ErrDuplicatedFingerprintAlgorithm(
                algorithm.to_owned(),
            ));
        }
        self.algorithms.insert(name, hash_function);
        Ok(self)
    }

    pub fn build(self) -> FingerprintRegistry {
        FingerprintRegistry {
            algorithms: self.algorithms,
        }
    }
}

/// FingerprintRegistry maps hash function names to implementations. It is
/// immutable once built and is shared by reference.
#[derive(Clone)]
pub struct FingerprintRegistry {
    algorithms: HashMap<UniCase<String>, HashFunction>,
}

impl Default for FingerprintRegistry {
    /// The hash functions of RFC 4572 section 5 that are still considered
    /// safe. md2 and md5 are deliberately missing.
    fn default() -> Self {
        let mut algorithms: HashMap<UniCase<String>, HashFunction> = HashMap::new();
        algorithms.insert(UniCase::new("sha-1".to_owned()), hash::<Sha1>);
        algorithms.insert(UniCase::new("sha-224".to_owned()), hash::<Sha224>);
        algorithms.insert(UniCase::new("sha-256".to_owned()), hash::<Sha256>);
        algorithms.insert(UniCase::new("sha-384".to_owned()), hash::<Sha384>);
        algorithms.insert(UniCase::new("sha-512".to_owned()), hash::<Sha512>);
        FingerprintRegistry { algorithms }
    }
}

impl fmt::Debug for FingerprintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintRegistry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}

impl FingerprintRegistry {
    pub fn builder() -> FingerprintRegistryBuilder {
        FingerprintRegistryBuilder::new()
    }

    /// algorithms returns the registered names, sorted.
    pub fn algorithms(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .algorithms
            .keys()
            .map(|name| name.to_string())
            .collect();
        names.sort();
        names
    }

    pub fn supports(&self, algorithm: &str) -> bool {
        self.algorithms.contains_key(&UniCase::new(algorithm.to_owned()))
    }

    /// compute_fingerprint returns the lowercase hex digest of the
    /// certificate, without separators.
    pub fn compute_fingerprint(&self, algorithm: &str, certificate: &[u8]) -> Result<String> {
        let hash_function = self
            .algorithms
            .get(&UniCase::new(algorithm.to_owned()))
            .ok_or_else(|| Error::ErrUnsupportedFingerprintAlgorithm(algorithm.to_owned()))?;
        Ok(hex::encode(hash_function(certificate)))
    }

    /// fingerprint returns the certificate fingerprint in its SDP form.
    pub fn fingerprint(&self, algorithm: &str, certificate: &[u8]) -> Result<RTCDtlsFingerprint> {
        let digest = self.compute_fingerprint(algorithm, certificate)?;
        let values: Vec<&str> = digest
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .collect();

        Ok(RTCDtlsFingerprint {
            algorithm: algorithm.to_lowercase(),
            value: values.join(":"),
        })
    }

    /// verify checks the certificate presented in the DTLS handshake
    /// against the fingerprints signaled by the peer. One match is enough;
    /// fingerprints with an unknown algorithm are skipped unless none is
    /// known.
    pub fn verify(
        &self,
        remote_fingerprints: &[RTCDtlsFingerprint],
        certificate: &[u8],
    ) -> Result<()> {
        if certificate.is_empty() {
            return Err(Error::ErrNonCertificate);
        }

        let mut unsupported = None;
        let mut checked = 0;
        for fp in remote_fingerprints {
            let local_value = match self.compute_fingerprint(&fp.algorithm, certificate) {
                Ok(value) => value,
                Err(err) => {
                    debug!("skipping fingerprint: {err}");
                    unsupported.get_or_insert(err);
                    continue;
                }
            };
            checked += 1;

            let remote_value: String = fp
                .value
                .chars()
                .filter(|c| *c != ':')
                .collect::<String>()
                .to_lowercase();
            if remote_value == local_value {
                return Ok(());
            }
        }

        match unsupported {
            Some(err) if checked == 0 => Err(err),
            _ => Err(Error::ErrNoMatchingCertificateFingerprint),
        }
    }
}
