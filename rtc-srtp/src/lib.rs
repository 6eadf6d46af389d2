#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod cipher;
pub mod config;
pub mod conn;
pub mod context;
pub mod key_derivation;
pub mod option;
pub mod protection_profile;
