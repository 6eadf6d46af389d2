use super::*;

const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
const SHA1_ABC: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

#[test]
fn test_compute_fingerprint() -> Result<()> {
    let registry = FingerprintRegistry::default();

    assert_eq!(registry.compute_fingerprint("sha-256", b"")?, SHA256_EMPTY);
    assert_eq!(registry.compute_fingerprint("sha-256", b"abc")?, SHA256_ABC);
    assert_eq!(registry.compute_fingerprint("sha-1", b"abc")?, SHA1_ABC);

    let digest = registry.compute_fingerprint("sha-256", b"certificate")?;
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    assert_eq!(
        digest,
        registry.compute_fingerprint("sha-256", b"certificate")?,
        "deterministic"
    );

    assert_eq!(registry.compute_fingerprint("sha-224", b"abc")?.len(), 56);
    assert_eq!(registry.compute_fingerprint("sha-384", b"abc")?.len(), 96);
    assert_eq!(registry.compute_fingerprint("sha-512", b"abc")?.len(), 128);

    Ok(())
}

#[test]
fn test_compute_fingerprint_case_insensitive() -> Result<()> {
    let registry = FingerprintRegistry::default();
    assert_eq!(registry.compute_fingerprint("SHA-256", b"abc")?, SHA256_ABC);
    assert!(registry.supports("Sha-1"));
    Ok(())
}

#[test]
fn test_compute_fingerprint_unsupported() {
    let registry = FingerprintRegistry::default();
    for algorithm in ["md5", "md2", "sha-3", ""] {
        assert_eq!(
            registry.compute_fingerprint(algorithm, b"abc"),
            Err(Error::ErrUnsupportedFingerprintAlgorithm(
                algorithm.to_owned()
            ))
        );
    }
}

#[test]
fn test_registry_builder() -> Result<()> {
    fn reversed(data: &[u8]) -> Vec<u8> {
        data.iter().rev().copied().collect()
    }

    let registry = FingerprintRegistry::builder()
        .register("reverse", reversed)?
        .build();
    assert_eq!(registry.algorithms(), vec!["reverse".to_owned()]);
    assert_eq!(registry.compute_fingerprint("reverse", &[1, 2, 0xab])?, "ab0201");
    assert!(!registry.supports("sha-256"));

    let duplicate = FingerprintRegistry::builder()
        .register("reverse", reversed)?
        .register("REVERSE", reversed);
    assert!(matches!(
        duplicate,
        Err(Error::ErrDuplicatedFingerprintAlgorithm(name)) if name == "REVERSE"
    ));
    Ok(())
}

#[test]
fn test_default_algorithms() {
    assert_eq!(
        FingerprintRegistry::default().algorithms(),
        vec!["sha-1", "sha-224", "sha-256", "sha-384", "sha-512"]
    );
}

#[test]
fn test_fingerprint_sdp_form() -> Result<()> {
    let registry = FingerprintRegistry::default();
    let fp = registry.fingerprint("SHA-256", b"abc")?;
    assert_eq!(fp.algorithm, "sha-256");
    assert_eq!(fp.value.len(), 32 * 3 - 1);
    assert!(fp.value.starts_with("ba:78:16:bf:"));
    assert_eq!(fp.value.replace(':', ""), SHA256_ABC);
    Ok(())
}

#[test]
fn test_fingerprint_parse() -> Result<()> {
    let fp = RTCDtlsFingerprint::try_from("sha-256 AB:CD:EF")?;
    assert_eq!(fp.algorithm, "sha-256");
    assert_eq!(fp.value, "AB:CD:EF");
    assert_eq!(fp.to_string(), "sha-256 AB:CD:EF");

    assert!(RTCDtlsFingerprint::try_from("sha-256").is_err());
    assert!(RTCDtlsFingerprint::try_from("sha-256 AB:CD extra").is_err());
    assert!(RTCDtlsFingerprint::try_from("sha-256 not-hex").is_err());
    Ok(())
}

#[test]
fn test_fingerprint_serde() -> Result<()> {
    let fp = FingerprintRegistry::default().fingerprint("sha-256", b"abc")?;
    let json = serde_json::to_string(&fp).map_err(|e| Error::Other(e.to_string()))?;
    assert!(json.contains("\"algorithm\":\"sha-256\""));
    let decoded: RTCDtlsFingerprint =
        serde_json::from_str(&json).map_err(|e| Error::Other(e.to_string()))?;
    assert_eq!(decoded, fp);
    Ok(())
}

#[test]
fn test_verify() -> Result<()> {
    let registry = FingerprintRegistry::default();
    let certificate = b"remote certificate";
    let good = registry.fingerprint("sha-256", certificate)?;

    registry.verify(std::slice::from_ref(&good), certificate)?;

    // uppercase, without separators
    let shouting = RTCDtlsFingerprint {
        algorithm: "SHA-256".to_owned(),
        value: good.value.replace(':', "").to_uppercase(),
    };
    registry.verify(&[shouting], certificate)?;

    // one unknown algorithm does not spoil a later match
    let md5 = RTCDtlsFingerprint {
        algorithm: "md5".to_owned(),
        value: "00".to_owned(),
    };
    registry.verify(&[md5.clone(), good.clone()], certificate)?;

    assert_eq!(
        registry.verify(std::slice::from_ref(&good), b"another certificate"),
        Err(Error::ErrNoMatchingCertificateFingerprint)
    );
    assert_eq!(
        registry.verify(&[md5], certificate),
        Err(Error::ErrUnsupportedFingerprintAlgorithm("md5".to_owned()))
    );
    assert_eq!(
        registry.verify(&[], certificate),
        Err(Error::ErrNoMatchingCertificateFingerprint)
    );
    assert_eq!(
        registry.verify(&[good], &[]),
        Err(Error::ErrNonCertificate)
    );
    Ok(())
}
