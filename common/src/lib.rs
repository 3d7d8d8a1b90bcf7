pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/duel.rs"));
}

pub mod config;
pub mod connection;
pub mod engine;
pub mod id_generator;
pub mod identifiers;
pub mod logger;
pub mod protocol;
pub mod session;
pub mod version;

pub use identifiers::*;
