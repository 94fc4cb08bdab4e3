//! The EncodedClientHelloInner: an inner ClientHello re-emitted with
//! its session id blanked and any extensions shared with the outer
//! hello squeezed down to one `ech_outer_extensions` reference.

use std::io::Cursor;

use byteorder::ReadBytesExt;
use log::*;

use crate::error::EchError;
use crate::hello::{ClientHello, HelloExtension};
use crate::ids::ExtensionType;

/// What the compression policy says to do with one extension type.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ExtensionAction {
    /// The outer hello carries an independently-generated value.
    Replicate,
    /// The outer hello reuses the inner bytes, but the inner still
    /// carries them itself.
    Copy,
    /// The inner drops the bytes and references the outer’s copy
    /// through `ech_outer_extensions`.
    Compress,
}

/// Per-extension-type compression decisions. Anything not mentioned is
/// copied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionPolicy {
    compressed: Vec<ExtensionType>,
    replicated: Vec<ExtensionType>,
}

impl CompressionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compress(mut self, ext_type: ExtensionType) -> Self {
        self.compressed.push(ext_type);
        self
    }

    pub fn replicate(mut self, ext_type: ExtensionType) -> Self {
        self.replicated.push(ext_type);
        self
    }

    pub fn action_for(&self, ext_type: ExtensionType) -> ExtensionAction {
        if self.compressed.contains(&ext_type) {
            ExtensionAction::Compress
        } else if self.replicated.contains(&ext_type) {
            ExtensionAction::Replicate
        } else {
            ExtensionAction::Copy
        }
    }
}

/// The output of compression: the encoded inner body, plus the types
/// that now live only in the outer hello.
#[derive(Debug, PartialEq)]
pub struct EncodedInner {
    pub bytes: Vec<u8>,
    pub outer_only: Vec<ExtensionType>,
}

/// Re-emits an inner ClientHello as an EncodedClientHelloInner body.
///
/// The session id is always blanked (the outer carries the real one),
/// and every extension the policy compresses is dropped in favour of a
/// single `ech_outer_extensions` extension written at the position of
/// the first compressed one. The relative order of everything else is
/// preserved.
pub fn encode_inner(inner: &ClientHello, policy: &CompressionPolicy) -> Result<EncodedInner, EchError> {
    let outer_only: Vec<ExtensionType> = inner.extensions.iter()
        .map(|e| e.ext_type)
        .filter(|t| policy.action_for(*t) == ExtensionAction::Compress)
        .collect();
    if outer_only.len() > 127 {
        return Err(EchError::BadExtension { reason: "too many compressed extensions" });
    }

    let mut extensions = Vec::with_capacity(inner.extensions.len());
    let mut reference_written = false;
    for extension in &inner.extensions {
        if policy.action_for(extension.ext_type) == ExtensionAction::Compress {
            if !reference_written {
                extensions.push(HelloExtension::new(
                    ExtensionType::EchOuterExtensions,
                    outer_extensions_body(&outer_only),
                ));
                reference_written = true;
            }
            continue;
        }
        extensions.push(extension.clone());
    }

    let encoded = ClientHello {
        session_id: Vec::new(),
        extensions,
        ..inner.clone()
    };
    debug!("encoded inner with {} compressed extension(s)", outer_only.len());
    Ok(EncodedInner { bytes: encoded.to_body()?, outer_only })
}

/// `u8 count_bytes · (u16 type)*`
fn outer_extensions_body(types: &[ExtensionType]) -> Vec<u8> {
    let mut body = Vec::with_capacity(1 + 2 * types.len());
    body.push((2 * types.len()) as u8);
    for ext_type in types {
        body.extend_from_slice(&u16::from(*ext_type).to_be_bytes());
    }
    body
}

/// Undoes [`encode_inner`] on the server: splices the outer’s session
/// id back in and replaces the `ech_outer_extensions` reference with
/// the referenced outer extensions, in the order the reference lists
/// them.
pub fn decode_inner(
    encoded: &[u8],
    outer: &ClientHello,
    session_id: &[u8],
) -> Result<(ClientHello, Vec<ExtensionType>), EchError> {
    let mut inner = ClientHello::from_body(encoded)?;
    if !inner.session_id.is_empty() {
        return Err(EchError::BadExtension { reason: "encoded inner session id not empty" });
    }
    inner.session_id = session_id.to_vec();

    let mut outer_only = Vec::new();
    let mut extensions = Vec::with_capacity(inner.extensions.len());
    let mut reference_seen = false;
    for extension in inner.extensions.drain(..) {
        if extension.ext_type != ExtensionType::EchOuterExtensions {
            extensions.push(extension);
            continue;
        }
        if reference_seen {
            return Err(EchError::BadExtension { reason: "duplicate ech_outer_extensions" });
        }
        reference_seen = true;

        for ext_type in parse_outer_extensions(&extension.body)? {
            if ext_type == ExtensionType::EncryptedClientHello {
                return Err(EchError::BadExtension { reason: "ech_outer_extensions references ech itself" });
            }
            let copied = outer.extension(ext_type)
                .ok_or(EchError::BadExtension { reason: "referenced extension missing from outer" })?;
            trace!("decompressing {:?} from outer ({} bytes)", ext_type, copied.body.len());
            extensions.push(copied.clone());
            outer_only.push(ext_type);
        }
    }
    inner.extensions = extensions;

    Ok((inner, outer_only))
}

fn parse_outer_extensions(body: &[u8]) -> Result<Vec<ExtensionType>, EchError> {
    let mut cursor = Cursor::new(body);
    let count_bytes = cursor.read_u8()?;
    if count_bytes == 0 || count_bytes % 2 != 0 || usize::from(count_bytes) != body.len() - 1 {
        return Err(EchError::BadExtension { reason: "bad ech_outer_extensions length" });
    }
    let mut types = Vec::with_capacity(usize::from(count_bytes / 2));
    for _ in 0..count_bytes / 2 {
        types.push(ExtensionType::from(cursor.read_u16::<byteorder::BigEndian>()?));
    }
    Ok(types)
}
