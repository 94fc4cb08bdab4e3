//! The accept-confirmation signal: eight bytes, derived from the
//! handshake secret and a transcript binding the inner ClientHello to
//! the ServerHello, carried in the low half of ServerHello.random.

use hkdf::Hkdf;
use log::*;
use sha2::{Digest, Sha256, Sha384};

use crate::error::EchError;

/// The HKDF-Expand-Label label for the confirmation value.
pub const ACCEPT_CONFIRMATION_LABEL: &[u8] = b"ech accept confirmation";

/// Offset of ServerHello.random inside the handshake message: one type
/// byte, three length bytes, two version bytes.
const RANDOM_AT: usize = 6;

/// The confirmation occupies the last 8 of the 32 random bytes.
const CONFIRMATION_AT: usize = RANDOM_AT + 24;

/// The transcript hash in use, as fixed by the negotiated TLS 1.3
/// cipher suite.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TranscriptHash {
    Sha256,
    Sha384,
}

impl TranscriptHash {
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }

    fn digest(self, input: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(input).to_vec(),
            Self::Sha384 => Sha384::digest(input).to_vec(),
        }
    }
}

/// Computes the 8-byte confirmation for a ServerHello. The transcript
/// is the inner ClientHello followed by the ServerHello with the last
/// eight bytes of its random zeroed; both are handshake messages,
/// headers included.
pub fn accept_confirmation(
    hash: TranscriptHash,
    handshake_secret: &[u8],
    inner_hello: &[u8],
    server_hello: &[u8],
) -> Result<[u8; 8], EchError> {
    if server_hello.len() < CONFIRMATION_AT + 8 {
        return Err(EchError::BadExtension { reason: "server hello too short" });
    }

    let mut transcript = Vec::with_capacity(inner_hello.len() + server_hello.len());
    transcript.extend_from_slice(inner_hello);
    transcript.extend_from_slice(server_hello);
    let tail = transcript.len() - server_hello.len() + CONFIRMATION_AT;
    transcript[tail..tail + 8].fill(0);

    let digest = hash.digest(&transcript);
    let okm = hkdf_expand_label(
        hash,
        handshake_secret,
        ACCEPT_CONFIRMATION_LABEL,
        &digest,
        hash.output_len(),
    )?;

    let mut confirmation = [0_u8; 8];
    confirmation.copy_from_slice(&okm[..8]);
    trace!("accept confirmation -> {:02x?}", confirmation);
    Ok(confirmation)
}

/// Server side: computes the confirmation and writes it into the
/// random tail of the ServerHello being emitted.
pub fn install_confirmation(
    hash: TranscriptHash,
    handshake_secret: &[u8],
    inner_hello: &[u8],
    server_hello: &mut [u8],
) -> Result<(), EchError> {
    let confirmation = accept_confirmation(hash, handshake_secret, inner_hello, server_hello)?;
    server_hello[CONFIRMATION_AT..CONFIRMATION_AT + 8].copy_from_slice(&confirmation);
    Ok(())
}

/// Client side: recomputes the confirmation and compares it with what
/// the server actually sent.
pub fn confirmation_matches(
    hash: TranscriptHash,
    handshake_secret: &[u8],
    inner_hello: &[u8],
    server_hello: &[u8],
) -> Result<bool, EchError> {
    let expected = accept_confirmation(hash, handshake_secret, inner_hello, server_hello)?;
    let received = &server_hello[CONFIRMATION_AT..CONFIRMATION_AT + 8];
    Ok(expected == received)
}

/// HKDF-Expand-Label from RFC 8446 section 7.1.
fn hkdf_expand_label(
    hash: TranscriptHash,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, EchError> {
    let mut info = Vec::with_capacity(4 + 6 + label.len() + context.len());
    info.extend_from_slice(&(out_len as u16).to_be_bytes());
    info.push((6 + label.len()) as u8);
    info.extend_from_slice(b"tls13 ");
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    let mut okm = vec![0_u8; out_len];
    let expanded = match hash {
        TranscriptHash::Sha256 => Hkdf::<Sha256>::from_prk(secret)
            .and_then(|hk| hk.expand(&info, &mut okm).map_err(|_| hkdf::InvalidPrkLength)),
        TranscriptHash::Sha384 => Hkdf::<Sha384>::from_prk(secret)
            .and_then(|hk| hk.expand(&info, &mut okm).map_err(|_| hkdf::InvalidPrkLength)),
    };
    match expanded {
        Ok(()) => Ok(okm),
        Err(_) => {
            warn!("handshake secret unusable as a {:?} prk", hash);
            Err(EchError::HpkeFailure)
        }
    }
}
