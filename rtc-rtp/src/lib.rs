#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod header;
pub mod packet;

pub use header::Header;
pub use packet::Packet;
