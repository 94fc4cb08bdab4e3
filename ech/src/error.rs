use std::io;

use log::*;

/// Something that can go wrong running the ECH protocol.
#[derive(PartialEq, Debug)]
pub enum EchError {

    /// There was an IO error reading from the cursor.
    /// Almost all the time, this means that the buffer was too short.
    Io,
    // (io::Error is not PartialEq so we don’t propagate it)

    /// Decoding of an ECHConfigList failed. The reason says which rule
    /// was broken.
    MalformedConfig {
        reason: &'static str,
    },

    /// No ECHConfig of a supported version was present. On the client
    /// this means ECH cannot be attempted; it is not fatal.
    UnsupportedVersion,

    /// The client could not find a config with a locally-supported HPKE
    /// suite. Not fatal either: fall back to GREASE or cleartext.
    NoMatchingSuite,

    /// HPKE seal or open returned failure. Fatal on the client; on the
    /// server this must be downgraded to GREASE, never surfaced as an
    /// alert, so that decryption failure cannot be used as an oracle.
    HpkeFailure,

    /// Structural error in the ECH extension (or the ClientHello around
    /// it) during the server parse. This one warrants a decode_error
    /// alert.
    BadExtension {
        reason: &'static str,
    },

    /// The client saw no accept confirmation in ServerHello.random.
    /// The handshake continues as ordinary TLS to the outer name.
    AcceptConfirmMismatch,

    /// The handshake completed but certificate validation of the inner
    /// name failed.
    BadName,
}

impl From<io::Error> for EchError {
    fn from(ioe: io::Error) -> Self {
        error!("IO error -> {:?}", ioe);
        Self::Io
    }
}
