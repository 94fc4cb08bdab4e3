//! An in-memory ClientHello: enough of one to build inner hellos,
//! splice extensions into outers, and scan received outers for the
//! fields ECH cares about without a full parse.

use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use log::*;

use crate::cursor::{
    put_u8, put_u16, put_u24, put_opaque16, patch_u16, read_u24, read_vec, CursorExt,
};
use crate::error::EchError;
use crate::ids::ExtensionType;

/// HandshakeType value for a ClientHello message.
pub const HANDSHAKE_CLIENT_HELLO: u8 = 1;

/// One extension of a ClientHello: a type and its raw value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HelloExtension {
    pub ext_type: ExtensionType,
    pub body: Vec<u8>,
}

impl HelloExtension {
    pub fn new(ext_type: ExtensionType, body: Vec<u8>) -> Self {
        Self { ext_type, body }
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        let ext_type = ExtensionType::from(cursor.read_u16::<BigEndian>()?);
        trace!("extension: {:?}", ext_type);
        let body = read_vec(cursor, 0..=u16::MAX)?;
        Ok(Self { ext_type, body })
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        put_u16(out, self.ext_type.into())?;
        put_opaque16(out, &self.body)
    }
}

/// A ClientHello body, from legacy_version through the extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientHello {
    pub legacy_version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<HelloExtension>,
}

impl ClientHello {

    /// Parses a ClientHello body (no handshake header).
    pub fn from_body(body: &[u8]) -> Result<Self, EchError> {
        let mut cursor = Cursor::new(body);

        let legacy_version = cursor.read_u16::<BigEndian>()?;
        trace!("legacy_version = 0x{:04x}", legacy_version);

        let mut random = [0_u8; 32];
        cursor.read_exact(&mut random)?;

        let session_id_len = cursor.read_u8()?;
        if session_id_len > 32 {
            return Err(EchError::BadExtension { reason: "legacy_session_id too long" });
        }
        let mut session_id = vec![0_u8; usize::from(session_id_len)];
        cursor.read_exact(&mut session_id)?;

        let suites_len = cursor.read_u16::<BigEndian>()?;
        if suites_len == 0 || suites_len % 2 != 0 {
            return Err(EchError::BadExtension { reason: "cipher_suites length must be a positive multiple of 2" });
        }
        let mut cipher_suites = Vec::with_capacity(usize::from(suites_len / 2));
        for _ in 0..suites_len / 2 {
            cipher_suites.push(cursor.read_u16::<BigEndian>()?);
        }

        let compression_len = cursor.read_u8()?;
        if compression_len == 0 {
            return Err(EchError::BadExtension { reason: "empty compression_methods" });
        }
        let mut compression_methods = vec![0_u8; usize::from(compression_len)];
        cursor.read_exact(&mut compression_methods)?;

        let extensions_len = cursor.read_u16::<BigEndian>()?;
        if usize::from(extensions_len) != cursor.std_remaining_slice().len() {
            return Err(EchError::BadExtension { reason: "extensions do not reach the end of the hello" });
        }
        let mut extensions = Vec::new();
        while !cursor.std_remaining_slice().is_empty() {
            extensions.push(HelloExtension::read_from(&mut cursor)?);
        }

        Ok(Self {
            legacy_version,
            random,
            session_id,
            cipher_suites,
            compression_methods,
            extensions,
        })
    }

    /// Emits the body back out, byte for byte.
    pub fn to_body(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(128);
        put_u16(&mut out, self.legacy_version)?;
        out.extend_from_slice(&self.random);

        if self.session_id.len() > 32 {
            return Err(io::Error::new(io::ErrorKind::Other, "legacy_session_id too long"));
        }
        put_u8(&mut out, self.session_id.len() as u8)?;
        out.extend_from_slice(&self.session_id);

        let mut suites = Vec::with_capacity(self.cipher_suites.len() * 2);
        for suite in &self.cipher_suites {
            put_u16(&mut suites, *suite)?;
        }
        put_opaque16(&mut out, &suites)?;

        if self.compression_methods.len() > 255 {
            return Err(io::Error::new(io::ErrorKind::Other, "too many compression methods"));
        }
        put_u8(&mut out, self.compression_methods.len() as u8)?;
        out.extend_from_slice(&self.compression_methods);

        let mut extensions = Vec::new();
        for extension in &self.extensions {
            extension.write_to(&mut extensions)?;
        }
        put_opaque16(&mut out, &extensions)?;
        Ok(out)
    }

    /// Parses a full handshake message (type and 24-bit length).
    pub fn from_handshake(message: &[u8]) -> Result<Self, EchError> {
        let mut cursor = Cursor::new(message);
        let msg_type = cursor.read_u8()?;
        if msg_type != HANDSHAKE_CLIENT_HELLO {
            return Err(EchError::BadExtension { reason: "not a client hello" });
        }
        let length = read_u24(&mut cursor)? as usize;
        let body = cursor.std_remaining_slice();
        if body.len() != length {
            return Err(EchError::BadExtension { reason: "handshake length mismatch" });
        }
        Self::from_body(body)
    }

    /// Emits a full handshake message.
    pub fn to_handshake(&self) -> io::Result<Vec<u8>> {
        let body = self.to_body()?;
        let mut out = Vec::with_capacity(4 + body.len());
        put_u8(&mut out, HANDSHAKE_CLIENT_HELLO)?;
        put_u24(&mut out, body.len() as u32)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn extension(&self, ext_type: ExtensionType) -> Option<&HelloExtension> {
        self.extensions.iter().find(|e| e.ext_type == ext_type)
    }

    /// Replaces an extension’s value in place, or appends it.
    pub fn set_extension(&mut self, ext_type: ExtensionType, body: Vec<u8>) {
        match self.extensions.iter_mut().find(|e| e.ext_type == ext_type) {
            Some(existing) => existing.body = body,
            None => self.extensions.push(HelloExtension { ext_type, body }),
        }
    }

    /// Removes an extension, preserving the order of the others.
    pub fn remove_extension(&mut self, ext_type: ExtensionType) -> Option<HelloExtension> {
        let at = self.extensions.iter().position(|e| e.ext_type == ext_type)?;
        Some(self.extensions.remove(at))
    }

    /// The host name from the server_name extension, if one is present.
    pub fn sni(&self) -> Result<Option<String>, EchError> {
        match self.extension(ExtensionType::ServerName) {
            Some(extension) => parse_sni(&extension.body),
            None => Ok(None),
        }
    }
}

/// Parses the body of a server_name extension, returning the first
/// host_name entry.
pub fn parse_sni(body: &[u8]) -> Result<Option<String>, EchError> {
    let mut cursor = Cursor::new(body);
    let list_len = cursor.read_u16::<BigEndian>()?;
    cursor.with_truncated(u64::from(list_len), |cursor, _| {
        while !cursor.std_remaining_slice().is_empty() {
            let name_type = cursor.read_u8()?;
            let name = read_vec(cursor, 1..=u16::MAX)?;
            if name_type == 0 {
                let host = String::from_utf8(name)
                    .map_err(|_| EchError::BadExtension { reason: "server name is not utf-8" })?;
                trace!("SNI -> {:?}", host);
                return Ok(Some(host));
            }
        }
        Ok(None)
    })
}

/// Builds the body of a server_name extension for one host name.
pub fn sni_extension_body(host: &str) -> io::Result<Vec<u8>> {
    let mut entry = Vec::with_capacity(3 + host.len());
    put_u8(&mut entry, 0)?; // name_type: host_name
    put_opaque16(&mut entry, host.as_bytes())?;

    let mut out = Vec::with_capacity(2 + entry.len());
    put_opaque16(&mut out, &entry)?;
    Ok(out)
}

/// Wraps an already wire-formatted ALPN protocol list into an
/// extension body.
pub fn alpn_extension_body(protocol_list: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 + protocol_list.len());
    put_opaque16(&mut out, protocol_list)?;
    Ok(out)
}

/// A window into a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub at: usize,
    pub len: usize,
}

impl Span {
    pub fn end(self) -> usize {
        self.at + self.len
    }

    pub fn of(self, buf: &[u8]) -> &[u8] {
        &buf[self.at..self.end()]
    }
}

/// The offsets a server needs from a received outer ClientHello,
/// gathered without a full parse.
#[derive(Debug, PartialEq)]
pub struct HelloOffsets {
    /// The legacy_session_id bytes.
    pub session_id: Span,
    /// Position of the u16 length that opens the extensions block.
    pub extensions_len_at: usize,
    /// The contents of the extensions block.
    pub extensions: Span,
    /// The whole ECH extension, header included, if present.
    pub ech: Option<Span>,
    /// Just the ECH extension’s value bytes.
    pub ech_body: Option<Span>,
    /// The server_name extension’s value bytes, if present.
    pub sni_body: Option<Span>,
}

/// Walks a ClientHello body recording where everything ECH-relevant
/// sits. This deliberately looks at as little as possible: the full
/// parse happens only after decryption succeeds.
pub fn scan_offsets(body: &[u8]) -> Result<HelloOffsets, EchError> {
    let mut cursor = Cursor::new(body);

    let _legacy_version = cursor.read_u16::<BigEndian>()?;
    let mut random = [0_u8; 32];
    cursor.read_exact(&mut random)?;

    let session_id_len = cursor.read_u8()?;
    let session_id = Span { at: cursor.position() as usize, len: usize::from(session_id_len) };
    skip(&mut cursor, usize::from(session_id_len))?;

    let suites_len = cursor.read_u16::<BigEndian>()?;
    skip(&mut cursor, usize::from(suites_len))?;

    let compression_len = cursor.read_u8()?;
    skip(&mut cursor, usize::from(compression_len))?;

    let extensions_len_at = cursor.position() as usize;
    let block_len = cursor.read_u16::<BigEndian>()?;
    let extensions = Span { at: cursor.position() as usize, len: usize::from(block_len) };
    if extensions.end() != body.len() {
        return Err(EchError::BadExtension { reason: "extensions do not reach the end of the hello" });
    }

    let mut ech = None;
    let mut ech_body = None;
    let mut sni_body = None;
    while (cursor.position() as usize) < extensions.end() {
        let ext_at = cursor.position() as usize;
        let ext_type = ExtensionType::from(cursor.read_u16::<BigEndian>()?);
        let ext_len = cursor.read_u16::<BigEndian>()?;
        let value = Span { at: cursor.position() as usize, len: usize::from(ext_len) };
        if value.end() > extensions.end() {
            return Err(EchError::BadExtension { reason: "extension overruns block" });
        }
        skip(&mut cursor, value.len)?;
        trace!("offset scan: {:?} at {}, {} value bytes", ext_type, ext_at, value.len);

        match ext_type {
            ExtensionType::EncryptedClientHello => {
                if ech.is_some() {
                    return Err(EchError::BadExtension { reason: "duplicate ech extension" });
                }
                ech = Some(Span { at: ext_at, len: 4 + value.len });
                ech_body = Some(value);
            }
            ExtensionType::ServerName => {
                sni_body = Some(value);
            }
            _ => {}
        }
    }

    Ok(HelloOffsets { session_id, extensions_len_at, extensions, ech, ech_body, sni_body })
}

fn skip(cursor: &mut Cursor<&[u8]>, n: usize) -> Result<(), EchError> {
    if cursor.std_remaining_slice().len() < n {
        return Err(EchError::Io);
    }
    cursor.set_position(cursor.position() + n as u64);
    Ok(())
}

/// Appends an extension to a ClientHello body, rewriting the
/// extensions-length field to cover it.
pub fn append_extension(body: &mut Vec<u8>, ext_type: ExtensionType, ext_body: &[u8]) -> Result<(), EchError> {
    let offsets = scan_offsets(body)?;
    let new_len = offsets.extensions.len + 4 + ext_body.len();
    if new_len > usize::from(u16::MAX) {
        return Err(EchError::BadExtension { reason: "extensions block overflow" });
    }
    put_u16(body, ext_type.into())?;
    put_opaque16(body, ext_body)?;
    patch_u16(body, offsets.extensions_len_at, new_len as u16);
    Ok(())
}

/// A copy of a ClientHello body with one extension cut out and the
/// extensions-length fixed up to match.
pub fn strip_extension(body: &[u8], offsets: &HelloOffsets, span: Span) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() - span.len);
    out.extend_from_slice(&body[..span.at]);
    out.extend_from_slice(&body[span.end()..]);
    patch_u16(&mut out, offsets.extensions_len_at, (offsets.extensions.len - span.len) as u16);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_hello() -> ClientHello {
        ClientHello {
            legacy_version: 0x0303,
            random: [7; 32],
            session_id: vec![9; 32],
            cipher_suites: vec![0x1301, 0x1302],
            compression_methods: vec![0],
            extensions: vec![
                HelloExtension::new(ExtensionType::ServerName, sni_extension_body("secret.example").unwrap()),
                HelloExtension::new(ExtensionType::SupportedGroups, vec![0, 2, 0, 29]),
                HelloExtension::new(ExtensionType::KeyShare, vec![0xaa; 40]),
            ],
        }
    }

    #[test]
    fn body_roundtrip() {
        crate::init_logs();
        let hello = sample_hello();
        let body = hello.to_body().unwrap();
        assert_eq!(ClientHello::from_body(&body).unwrap(), hello);
    }

    #[test]
    fn handshake_roundtrip() {
        crate::init_logs();
        let hello = sample_hello();
        let message = hello.to_handshake().unwrap();
        assert_eq!(message[0], HANDSHAKE_CLIENT_HELLO);
        assert_eq!(ClientHello::from_handshake(&message).unwrap(), hello);
    }

    #[test]
    fn sni_comes_back_out() {
        crate::init_logs();
        let hello = sample_hello();
        assert_eq!(hello.sni().unwrap(), Some("secret.example".to_owned()));
    }

    #[test]
    fn offsets_line_up() {
        crate::init_logs();
        let hello = sample_hello();
        let body = hello.to_body().unwrap();
        let offsets = scan_offsets(&body).unwrap();

        assert_eq!(offsets.session_id.of(&body), &[9; 32][..]);
        assert_eq!(offsets.ech, None);
        let sni = offsets.sni_body.unwrap();
        assert_eq!(parse_sni(sni.of(&body)).unwrap(), Some("secret.example".to_owned()));
    }

    #[test]
    fn append_then_strip_is_identity() {
        crate::init_logs();
        let hello = sample_hello();
        let original = hello.to_body().unwrap();

        let mut spliced = original.clone();
        append_extension(&mut spliced, ExtensionType::EncryptedClientHello, &[1, 2, 3, 4, 5]).unwrap();

        // the parser sees the new extension, and the lengths still add up
        let parsed = ClientHello::from_body(&spliced).unwrap();
        assert_eq!(
            parsed.extension(ExtensionType::EncryptedClientHello).map(|e| e.body.clone()),
            Some(vec![1, 2, 3, 4, 5]),
        );

        let offsets = scan_offsets(&spliced).unwrap();
        let stripped = strip_extension(&spliced, &offsets, offsets.ech.unwrap());
        assert_eq!(stripped, original);
    }

    #[test]
    fn truncated_hello_is_rejected() {
        crate::init_logs();
        let hello = sample_hello();
        let body = hello.to_body().unwrap();
        assert!(ClientHello::from_body(&body[..body.len() - 3]).is_err());
        assert!(scan_offsets(&body[..40]).is_err());
    }
}
