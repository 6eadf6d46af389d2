
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use shared::error::{Error, Result};

pub const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub const LABEL_SRTP_AUTHENTICATION_TAG: u8 = 0x01;
pub const LABEL_SRTP_SALT: u8 = 0x02;
pub const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub const LABEL_SRTCP_AUTHENTICATION_TAG: u8 = 0x04;
pub const LABEL_SRTCP_SALT: u8 = 0x05;

pub(crate) const SRTCP_INDEX_SIZE: usize = 4;
const BLOCK_SIZE: usize = 16;

/// aes_cm_key_derivation runs the AES-CM PRF of RFC 3711 section 4.3 with a
/// key derivation rate of zero.
pub fn aes_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    index_over_kdr: usize,
    out_len: usize,
) -> Result<Vec<u8>> {
    if index_over_kdr != 0 {
        // 24-bit "index DIV kdr" must be xored to prf input.
        return Err(Error::ErrNonZeroKdrNotSupported);
    }
    if master_salt.len() > BLOCK_SIZE - 2 {
        return Err(Error::SrtpSaltLength(BLOCK_SIZE - 2, master_salt.len()));
    }

    let encrypt: Box<dyn Fn(&mut [u8])> = match master_key.len() {
        16 => {
            let block = Aes128::new_from_slice(master_key)?;
            Box::new(move |b| block.encrypt_block(GenericArray::from_mut_slice(b)))
        }
        32 => {
            let block = Aes256::new_from_slice(master_key)?;
            Box::new(move |b| block.encrypt_block(GenericArray::from_mut_slice(b)))
        }
        n => return Err(Error::SrtpMasterKeyLength(16, n)),
    };

    // https://tools.ietf.org/html/rfc3711#appendix-B.3
    // The input block for AES-CM is generated by exclusive-oring the master salt with the
    // concatenation of the encryption key label 0x00 with (index DIV kdr),
    // - index is 'rollover count' and DIV is 'divided by'
    let mut prf_in = [0u8; BLOCK_SIZE];
    prf_in[..master_salt.len()].copy_from_slice(master_salt);
    prf_in[7] ^= label;

    // The resulting value is then AES encrypted using the master key to get the cipher key.
    let mut out = vec![0u8; out_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE];
    for (i, block) in out.chunks_exact_mut(BLOCK_SIZE).enumerate() {
        prf_in[BLOCK_SIZE - 2..].copy_from_slice(&(i as u16).to_be_bytes());
        block.copy_from_slice(&prf_in);
        encrypt(block);
    }
    out.truncate(out_len);

    Ok(out)
}

/// generate_counter builds the AES-CM IV of RFC 3711 section 4.1.1:
///
/// IV = (k_s * 2^16) XOR (SSRC * 2^64) XOR (i * 2^16)
pub(crate) fn generate_counter(
    sequence_number: u16,
    rollover_counter: u32,
    ssrc: u32,
    session_salt: &[u8],
) -> [u8; BLOCK_SIZE] {
    let mut counter = [0u8; BLOCK_SIZE];
    counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
    counter[8..12].copy_from_slice(&rollover_counter.to_be_bytes());
    counter[12..14].copy_from_slice(&sequence_number.to_be_bytes());

    for (c, s) in counter.iter_mut().zip(session_salt) {
        *c ^= *s;
    }

    counter
}
