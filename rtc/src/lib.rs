//! # RTC
//!
//! The media transport core of a WebRTC peer connection: the pieces that sit
//! between an established ICE transport and the application's media and
//! data channel APIs.
//!
//! - [`fingerprint`] checks the DTLS certificate of the peer against the
//!   fingerprints it signaled.
//! - [`srtp_transport`] keys SRTP from the DTLS handshake and protects media
//!   on the shared ICE transport.
//! - [`ice_transport`] tells interested parties about connectivity changes.
//!
//! The protocol crates are re-exported so applications need only this one.
#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub use {datachannel, shared, srtp};

pub mod fingerprint;
pub mod ice_transport;
pub mod srtp_transport;
