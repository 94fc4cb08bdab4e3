#![warn(deprecated_in_future)]
#![warn(future_incompatible)]
#![warn(nonstandard_style)]
#![warn(rust_2018_compatibility)]
#![warn(rust_2018_idioms)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused)]

#![deny(unsafe_code)]


//! The ECH crate is the protocol engine: decoding ECHConfigLists from
//! the transports they are published over, compressing an inner
//! ClientHello against its outer, sealing and opening it with HPKE,
//! and confirming on the ServerHello that the server really honoured
//! the inner. It does no I/O and holds no keys; the key store lives in
//! the `ech-keys` crate, and the TLS state machine around all of this
//! is someone else’s problem.

#[macro_use]
mod macros;
mod cursor;

pub mod client;
pub mod config;
pub mod confirm;
pub mod encoded;
pub mod grease;
pub mod hello;
pub mod hpke;
pub mod ids;
pub mod server;
pub mod session;

mod error;

pub use self::config::{EchConfig, EchConfigList, GuessedFormat, PublicName};
pub use self::error::EchError;
pub use self::ids::{EchVersion, HpkeAeadId, HpkeKdfId, HpkeKemId, HpkeSymmetricCipherSuite};
pub use self::session::{EchOptions, EchSession, EchState, HelloView, OuterSni};

#[cfg(test)]
fn init_logs() {
    use std::sync::Once;
    static LOG_INIT: Once = Once::new();
    LOG_INIT.call_once(|| {
        env_logger::init();
    });
}
