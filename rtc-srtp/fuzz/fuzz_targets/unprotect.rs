#![no_main]
use libfuzzer_sys::fuzz_target;

use rtc_shared::util::is_rtcp;
use rtc_srtp::context::Context;
use rtc_srtp::option::{srtcp_replay_protection, srtp_replay_protection};
use rtc_srtp::protection_profile::ProtectionProfile;

const MASTER_KEY: [u8; 16] = [
    0x0d, 0xcd, 0x21, 0x3e, 0x4c, 0xbc, 0xf2, 0x8f, 0x01, 0x7f, 0x69, 0x94, 0x40, 0x1e, 0x28, 0x89,
];
const MASTER_SALT: [u8; 14] = [
    0x62, 0x77, 0x60, 0x38, 0xc0, 0x6d, 0xc9, 0x41, 0x9f, 0x6d, 0xd9, 0x43, 0x3e, 0x7c,
];

fuzz_target!(|data: &[u8]| {
    let Ok(context) = Context::new(
        &MASTER_KEY,
        &MASTER_SALT,
        ProtectionProfile::Aes128CmHmacSha1_80,
        Some(srtp_replay_protection(64)),
        Some(srtcp_replay_protection(64)),
    ) else {
        return;
    };
    let _ = if is_rtcp(data) {
        context.decrypt_rtcp(data)
    } else {
        context.decrypt_rtp(data)
    };
});
