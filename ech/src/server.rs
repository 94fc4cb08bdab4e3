//! The server side: find the ECH extension in a received outer
//! ClientHello, try the stored keys against it, and reconstruct the
//! inner hello when one of them fits.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use log::*;

use crate::cursor::{put_u8, put_u16, put_u24, read_u24, read_vec, CursorExt, ReadFromCursor};
use crate::encoded::decode_inner;
use crate::error::EchError;
use crate::hello::{
    parse_sni, scan_offsets, strip_extension, ClientHello, HANDSHAKE_CLIENT_HELLO,
};
use crate::hpke;
use crate::ids::{
    ExtensionType, HpkeKemId, HpkeSymmetricCipherSuite, MAX_ECH_ENC_LEN, MAX_ECH_PAYLOAD_LEN,
};
use crate::session::EchSession;

/// ContentType value for a handshake record.
const RECORD_HANDSHAKE: u8 = 0x16;

/// A stored key as the decoder needs it: borrowed views, so the key
/// store stays intact whatever happens here.
#[derive(Debug, Clone, Copy)]
pub struct ServerKey<'a> {
    pub config_id: u8,
    pub kem_id: HpkeKemId,
    /// The verbatim ECHConfig encoding, version+length header included.
    pub config_encoding: &'a [u8],
    pub private_key: &'a [u8],
}

/// The parsed body of a received ECH extension.
#[derive(Debug, PartialEq)]
pub struct EchExtension {
    pub suite: HpkeSymmetricCipherSuite,
    pub config_id: u8,
    pub enc: Vec<u8>,
    pub payload: Vec<u8>,
}

/// Parses an ECH extension body, applying the size limits the spec
/// puts on hostile input.
pub fn parse_ech_extension(body: &[u8]) -> Result<EchExtension, EchError> {
    let mut cursor = Cursor::new(body);
    let suite = HpkeSymmetricCipherSuite::read_from(&mut cursor)?;
    let config_id = cursor.read_u8()?;
    let enc = read_vec(&mut cursor, 0..=u16::MAX)?;
    if enc.len() > MAX_ECH_ENC_LEN {
        return Err(EchError::BadExtension { reason: "enc too long" });
    }
    let payload = read_vec(&mut cursor, 1..=u16::MAX)?;
    if payload.len() > MAX_ECH_PAYLOAD_LEN {
        return Err(EchError::BadExtension { reason: "payload too long" });
    }
    if !cursor.std_remaining_slice().is_empty() {
        return Err(EchError::BadExtension { reason: "trailing bytes in ech extension" });
    }
    trace!(
        "ech extension: {:?}, config_id {}, {} enc bytes, {} payload bytes",
        suite, config_id, enc.len(), payload.len(),
    );
    Ok(EchExtension { suite, config_id, enc, payload })
}

/// What trying to decrypt an outer hello produced.
#[derive(Debug, PartialEq)]
pub enum ServerDecrypt {
    /// No ECH extension at all. The session was left untouched.
    NotPresent,
    /// There was an extension but nothing decrypted it. Not an error:
    /// the handshake continues to the outer name.
    Grease,
    /// The inner hello, reconstructed.
    Accepted {
        inner: ClientHello,
        outer_only: Vec<ExtensionType>,
    },
}

/// Runs the whole server pipeline over a received outer ClientHello
/// body: offset scan, extension parse, AAD reconstruction, key-matched
/// and optionally trial decryption, and inner reconstruction.
///
/// Structural failures come back as errors (worth a decode_error
/// alert). Decryption failures never do; they downgrade to
/// [`ServerDecrypt::Grease`] so that nothing about the stored keys
/// leaks.
pub fn decrypt_outer(
    session: &mut EchSession,
    outer_body: &[u8],
    keys: &[ServerKey<'_>],
    trial_decrypt: bool,
) -> Result<ServerDecrypt, EchError> {
    let offsets = scan_offsets(outer_body)?;
    let (ech_span, ech_body_span) = match (offsets.ech, offsets.ech_body) {
        (Some(whole), Some(body)) => (whole, body),
        _ => {
            debug!("no ech extension in this hello");
            return Ok(ServerDecrypt::NotPresent);
        }
    };

    session.mark_attempted();
    session.session_id = offsets.session_id.of(outer_body).to_vec();
    if let Some(sni_span) = offsets.sni_body {
        session.outer_name = parse_sni(sni_span.of(outer_body))?;
        debug!("outer sni -> {:?}", session.outer_name);
    }

    let ech = parse_ech_extension(ech_body_span.of(outer_body))?;

    // the AAD covers the outer hello as if the ECH extension had never
    // been there
    let stripped = strip_extension(outer_body, &offsets, ech_span);
    let aad = hpke::ech_aad(ech.suite, ech.config_id, &ech.enc, &stripped)?;

    // keys whose config_id matches go first; the rest only when trial
    // decryption is switched on
    let mut candidates: Vec<&ServerKey<'_>> =
        keys.iter().filter(|key| key.config_id == ech.config_id).collect();
    if trial_decrypt {
        candidates.extend(keys.iter().filter(|key| key.config_id != ech.config_id));
    }
    debug!("{} candidate key(s) for config_id {}", candidates.len(), ech.config_id);

    let mut plaintext = None;
    for key in candidates {
        let info = hpke::ech_hpke_info(key.config_encoding);
        match hpke::open(key.kem_id, ech.suite, key.private_key, &ech.enc, &info, &aad, &ech.payload) {
            Ok(opened) => {
                plaintext = Some(opened);
                break;
            }
            Err(reason) => {
                debug!("open with config_id {} failed: {:?}", key.config_id, reason);
            }
        }
    }
    let plaintext = match plaintext {
        Some(plaintext) => plaintext,
        None => {
            info!("nothing decrypted this extension; treating it as grease");
            session.mark_grease();
            return Ok(ServerDecrypt::Grease);
        }
    };

    let outer = ClientHello::from_body(outer_body)?;
    let (inner, outer_only) = decode_inner(&plaintext, &outer, &session.session_id)?;
    session.inner_name = inner.sni()?;
    info!("decrypted inner hello for {:?}", session.inner_name);

    let inner_handshake = inner.to_handshake()?;
    session.swap_to_inner(inner_handshake, outer_only.clone());
    session.mark_success();
    Ok(ServerDecrypt::Accepted { inner, outer_only })
}

/// Rebuilds a handshake transcript after the swap: a fresh buffer
/// seeded with the reconstructed inner. If the old transcript began
/// with a ClientHello of exactly the outer’s length, whatever followed
/// it is kept.
pub fn rebuild_transcript(
    transcript: &[u8],
    outer_handshake_len: usize,
    inner_handshake: &[u8],
) -> Vec<u8> {
    let mut rebuilt = Vec::with_capacity(inner_handshake.len());
    rebuilt.extend_from_slice(inner_handshake);

    if transcript.first() == Some(&HANDSHAKE_CLIENT_HELLO)
        && handshake_len(transcript) == Some(outer_handshake_len)
        && transcript.len() >= outer_handshake_len
    {
        rebuilt.extend_from_slice(&transcript[outer_handshake_len..]);
    } else if !transcript.is_empty() {
        warn!("transcript does not start with the outer hello; keeping only the inner");
    }
    rebuilt
}

fn handshake_len(buf: &[u8]) -> Option<usize> {
    let mut cursor = Cursor::new(buf);
    let _msg_type = cursor.read_u8().ok()?;
    let body_len = read_u24(&mut cursor).ok()?;
    Some(4 + body_len as usize)
}

/// What the one-shot split-mode entry point tells a front-end proxy.
#[derive(Debug, PartialEq)]
pub enum SplitOutcome {
    NotPresent {
        outer_sni: Option<String>,
    },
    Grease {
        outer_sni: Option<String>,
    },
    /// The decrypted hello, framed the same way the input was, ready
    /// to forward to a backend.
    Inner {
        hello: Vec<u8>,
        inner_sni: Option<String>,
        outer_sni: Option<String>,
    },
}

/// "Decrypt this wire ClientHello for me": accepts either a TLS
/// plaintext record holding a ClientHello or a bare handshake message,
/// and answers in kind.
pub fn split_mode_decrypt(
    wire: &[u8],
    keys: &[ServerKey<'_>],
    trial_decrypt: bool,
) -> Result<SplitOutcome, EchError> {
    match wire.first() {
        Some(&RECORD_HANDSHAKE) => {
            let mut cursor = Cursor::new(wire);
            let _content_type = cursor.read_u8()?;
            let record_version = cursor.read_u16::<BigEndian>()?;
            let record_len = cursor.read_u16::<BigEndian>()?;
            let message = cursor.std_remaining_slice();
            if message.len() != usize::from(record_len) {
                return Err(EchError::BadExtension { reason: "record length mismatch" });
            }

            match split_handshake(message, keys, trial_decrypt)? {
                SplitOutcome::Inner { hello, inner_sni, outer_sni } => {
                    let mut record = Vec::with_capacity(5 + hello.len());
                    put_u8(&mut record, RECORD_HANDSHAKE)?;
                    put_u16(&mut record, record_version)?;
                    if hello.len() > usize::from(u16::MAX) {
                        return Err(EchError::BadExtension { reason: "inner hello too long for a record" });
                    }
                    put_u16(&mut record, hello.len() as u16)?;
                    record.extend_from_slice(&hello);
                    Ok(SplitOutcome::Inner { hello: record, inner_sni, outer_sni })
                }
                other => Ok(other),
            }
        }
        Some(&HANDSHAKE_CLIENT_HELLO) => split_handshake(wire, keys, trial_decrypt),
        _ => Err(EchError::BadExtension { reason: "not a client hello" }),
    }
}

fn split_handshake(
    message: &[u8],
    keys: &[ServerKey<'_>],
    trial_decrypt: bool,
) -> Result<SplitOutcome, EchError> {
    let mut cursor = Cursor::new(message);
    let msg_type = cursor.read_u8()?;
    let body_len = read_u24(&mut cursor)? as usize;
    let body = cursor.std_remaining_slice();
    if msg_type != HANDSHAKE_CLIENT_HELLO || body.len() != body_len {
        return Err(EchError::BadExtension { reason: "not a client hello" });
    }

    let offsets = scan_offsets(body)?;
    let outer_sni = match offsets.sni_body {
        Some(span) => parse_sni(span.of(body))?,
        None => None,
    };

    let mut session = EchSession::for_backend();
    match decrypt_outer(&mut session, body, keys, trial_decrypt)? {
        ServerDecrypt::NotPresent => Ok(SplitOutcome::NotPresent { outer_sni }),
        ServerDecrypt::Grease => Ok(SplitOutcome::Grease { outer_sni }),
        ServerDecrypt::Accepted { inner, .. } => {
            let mut hello = Vec::new();
            put_u8(&mut hello, HANDSHAKE_CLIENT_HELLO)?;
            let inner_body = inner.to_body()?;
            put_u24(&mut hello, inner_body.len() as u32)?;
            hello.extend_from_slice(&inner_body);
            Ok(SplitOutcome::Inner { hello, inner_sni: inner.sni()?, outer_sni })
        }
    }
}
