//! Wire framing.

pub mod opc;

pub use opc::{encode, parse_header, Header, Packet};
