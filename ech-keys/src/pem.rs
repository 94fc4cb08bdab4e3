//! The PEM-like container a server key arrives in: one `PRIVATE KEY`
//! block and one `ECHCONFIG` block in a single small file.
//!
//! No third-party PEM reader handles the custom `ECHCONFIG` tag, so
//! the armor is taken apart here and only the PKCS#8 innards go
//! through a real parser.

use std::convert::TryFrom;

use log::*;
use pkcs8::{ObjectIdentifier, PrivateKeyInfo};

use crate::Error;

const OID_X25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.110");

/// The two halves of a parsed container.
pub(crate) struct PemContainer {
    /// The raw KEM private key.
    pub private_key: Vec<u8>,
    /// The binary ECHConfigList.
    pub config_bytes: Vec<u8>,
}

pub(crate) fn parse_container(input: &[u8]) -> Result<PemContainer, Error> {
    let text = std::str::from_utf8(input)
        .map_err(|_| Error::Pem("container is not ascii"))?;

    let key_der = decode_block(text, "PRIVATE KEY")?;
    let config_bytes = decode_block(text, "ECHCONFIG")?;
    let private_key = unwrap_pkcs8(&key_der)?;
    Ok(PemContainer { private_key, config_bytes })
}

fn decode_block(text: &str, tag: &str) -> Result<Vec<u8>, Error> {
    let begin = format!("-----BEGIN {}-----", tag);
    let end = format!("-----END {}-----", tag);

    let start = match text.find(&begin) {
        Some(at) => at + begin.len(),
        None => {
            debug!("no {} block in container", tag);
            return Err(Error::Pem("missing block"));
        }
    };
    let length = text[start..].find(&end)
        .ok_or(Error::Pem("unterminated block"))?;

    let body: String = text[start..start + length]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::decode(&body).map_err(|_| Error::Pem("invalid base64 in block"))
}

/// Pulls the raw key out of a PKCS#8 document. Only X25519 (RFC 8410)
/// keys are stored server-side.
fn unwrap_pkcs8(der: &[u8]) -> Result<Vec<u8>, Error> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|_| Error::Pem("private key is not pkcs#8"))?;
    if info.algorithm.oid != OID_X25519 {
        warn!("rejecting private key with algorithm {}", info.algorithm.oid);
        return Err(Error::UnsupportedKeyAlgorithm);
    }

    // RFC 8410 wraps the 32 key bytes in an inner OCTET STRING; some
    // tools emit them bare
    match info.private_key {
        [0x04, 0x20, key @ ..] if key.len() == 32 => Ok(key.to_vec()),
        key if key.len() == 32 => Ok(key.to_vec()),
        _ => Err(Error::Pem("unexpected x25519 key shape")),
    }
}
