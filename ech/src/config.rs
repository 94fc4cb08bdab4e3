//! Decoding ECHConfig and ECHConfigList structures from the transports
//! they arrive over: raw binary, ascii-hex, base64, and the `ech=`
//! parameter of an HTTPS/SVCB record.

use core::fmt;
use std::convert::TryFrom;
use std::io::{self, Cursor, Read};
use std::str::FromStr;

use byteorder::{BigEndian, ReadBytesExt};
use log::*;

use crate::cursor::{read_vec, CursorExt, ReadFromCursor};
use crate::error::EchError;
use crate::ids::{
    EchVersion, HpkeKemId, HpkeSymmetricCipherSuite,
    MAX_ECHCONFIGLIST_LEN, MIN_ECHCONFIGLIST_LEN,
};

/// The SvcParamKey carrying an ECHConfigList in an HTTPS/SVCB record.
const SVC_PARAM_ECH: u16 = 5;

/// The `public_name` field of an ECHConfig: the cover name placed in
/// the outer ClientHello.
#[derive(Clone, PartialEq)]
pub struct PublicName(pub Vec<u8>);

impl fmt::Debug for PublicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = &self.0[..];
        String::from_utf8_lossy(bytes).fmt(f)
    }
}

impl fmt::Display for PublicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = &self.0[..];
        String::from_utf8_lossy(bytes).fmt(f)
    }
}

impl FromStr for PublicName {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if (2..=255).contains(&s.len()) {
            Ok(Self(s.as_bytes().to_vec()))
        } else {
            Err("name length not in range 2..=255")
        }
    }
}

impl PublicName {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, EchError> {
        let len = cursor.read_u16::<BigEndian>()?;
        trace!("public_name length = {}", len);
        if len <= 1 || len > 255 {
            return Err(EchError::MalformedConfig {
                reason: "public_name length must be within 2..=255",
            });
        }
        let mut vec = vec![0u8; usize::from(len)];
        cursor.read_exact(&mut vec)?;
        trace!("public_name = {:?}", std::str::from_utf8(&vec));
        Ok(Self(vec))
    }
}

/// An extension carried inside an ECHConfig. Empty values are valid.
#[derive(Debug, Clone, PartialEq)]
pub struct EchConfigExtension {
    pub ext_type: u16,
    pub body: Vec<u8>,
}

/// A single published server configuration.
///
/// The raw on-the-wire encoding doubles as the HPKE "info" string, so
/// each config remembers where its own bytes sit inside the owning
/// [`EchConfigList`]: `encoding_start`/`encoding_length` index into the
/// list’s raw buffer and cover everything from the version field to the
/// end of the extensions, the four-byte version+length header included.
#[derive(Debug, Clone, PartialEq)]
pub struct EchConfig {
    pub version: EchVersion,
    /// Short identifier used for server-side key selection. Draft-09
    /// configs have none on the wire; they get zero.
    pub config_id: u8,
    pub kem_id: HpkeKemId,
    pub public_key: Vec<u8>,
    pub cipher_suites: Vec<HpkeSymmetricCipherSuite>,
    pub maximum_name_length: u16,
    pub public_name: PublicName,
    pub extensions: Vec<EchConfigExtension>,
    encoding_start: usize,
    encoding_length: usize,
}

impl EchConfig {
    /// Whether this config offers the given symmetric suite.
    pub fn offers(&self, suite: HpkeSymmetricCipherSuite) -> bool {
        self.cipher_suites.contains(&suite)
    }

    /// The window of the owning list’s raw bytes holding this config.
    pub fn encoding_window(&self) -> (usize, usize) {
        (self.encoding_start, self.encoding_length)
    }
}

/// An ordered sequence of [`EchConfig`]s plus the raw outer encoding
/// they were decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct EchConfigList {
    configs: Vec<EchConfig>,
    raw: Vec<u8>,
}

/// What the format guesser decided an input was.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GuessedFormat {
    /// Raw ECHConfigList bytes.
    Bin,
    /// `;`-separable ascii-hex.
    AsciiHex,
    /// `;`-separable base64.
    B64Txt,
    /// Presentation-form HTTPS/SVCB data containing an `ech=` parameter.
    HttpsSvc,
}

/// Classifies raw input bytes, most restrictive interpretation first.
pub fn guess_format(input: &[u8]) -> GuessedFormat {
    if input.windows(4).any(|w| w == b"ech=") {
        return GuessedFormat::HttpsSvc;
    }
    if !input.is_empty() && input.iter().all(|b| b.is_ascii_hexdigit() || *b == b';') {
        return GuessedFormat::AsciiHex;
    }
    if !input.is_empty() && input.iter().all(|b| {
        b.is_ascii_alphanumeric() || matches!(*b, b'+' | b'/' | b'=' | b';')
    }) {
        return GuessedFormat::B64Txt;
    }
    GuessedFormat::Bin
}

impl EchConfigList {
    /// Decodes one ECHConfigList from the front of `input`, returning
    /// it together with whatever bytes follow the declared length.
    /// Those leftover bytes may well begin another list; see
    /// [`EchConfigList::read_all`].
    pub fn from_binary(input: &[u8]) -> Result<(Self, &[u8]), EchError> {
        let mut cursor = Cursor::new(input);

        let total_length = cursor.read_u16::<BigEndian>()?;
        trace!("ECHConfigList length = {}", total_length);
        if total_length < MIN_ECHCONFIGLIST_LEN || total_length >= MAX_ECHCONFIGLIST_LEN {
            return Err(EchError::MalformedConfig {
                reason: "list length out of range",
            });
        }
        if usize::from(total_length) > input.len() - 2 {
            return Err(EchError::MalformedConfig {
                reason: "list length exceeds input",
            });
        }

        let consumed = 2 + usize::from(total_length);
        let configs = cursor.with_truncated(u64::from(total_length), |cursor, _| {
            Self::read_configs(cursor)
        })?;

        let list = Self {
            configs,
            raw: input[..consumed].to_vec(),
        };
        Ok((list, &input[consumed..]))
    }

    /// Decodes a whole buffer of concatenated ECHConfigLists.
    pub fn read_all(input: &[u8]) -> Result<Vec<Self>, EchError> {
        let mut lists = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            let (list, leftover) = Self::from_binary(rest)?;
            debug!("decoded list of {} configs, {} bytes leftover", list.len(), leftover.len());
            lists.push(list);
            rest = leftover;
        }
        Ok(lists)
    }

    /// The front door: guesses the transport format, undoes it, and
    /// decodes every list the input carries.
    pub fn from_input(input: &[u8]) -> Result<Vec<Self>, EchError> {
        let guessed = guess_format(input);
        debug!("guessed input format -> {:?}", guessed);
        let binary = match guessed {
            GuessedFormat::Bin => input.to_vec(),
            GuessedFormat::AsciiHex => decode_fragments(input, |frag| {
                hex::decode(frag).map_err(|e| {
                    warn!("ascii-hex fragment did not decode: {}", e);
                    EchError::MalformedConfig { reason: "invalid ascii-hex" }
                })
            })?,
            GuessedFormat::B64Txt => decode_fragments(input, |frag| {
                base64::decode(frag).map_err(|e| {
                    warn!("base64 fragment did not decode: {}", e);
                    EchError::MalformedConfig { reason: "invalid base64" }
                })
            })?,
            GuessedFormat::HttpsSvc => ech_value_from_presentation(input)?,
        };
        Self::read_all(&binary)
    }

    /// Convenience for the single-list base64 transport.
    pub fn from_base64(text: &str) -> Result<Self, EchError> {
        let buffer = base64::decode_config(text, base64::STANDARD)
            .map_err(|_| EchError::MalformedConfig { reason: "invalid base64" })?;
        let (list, leftover) = Self::from_binary(&buffer)?;
        if leftover.is_empty() {
            Ok(list)
        } else {
            Err(EchError::MalformedConfig { reason: "base64 input had leftover bytes" })
        }
    }

    pub fn configs(&self) -> &[EchConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// The raw bytes the list was decoded from, length prefix included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The verbatim encoding of the config at `index` — the HPKE "info"
    /// tail. Panics if `index` is out of bounds.
    pub fn encoding(&self, index: usize) -> &[u8] {
        let (start, length) = self.configs[index].encoding_window();
        &self.raw[start..start + length]
    }

    /// The sole config of a one-config list, if it is one.
    pub fn single(&self) -> Option<&EchConfig> {
        match self.configs.as_slice() {
            [one] => Some(one),
            _ => None,
        }
    }

    fn read_configs(cursor: &mut Cursor<&[u8]>) -> Result<Vec<EchConfig>, EchError> {
        let mut configs = Vec::new();
        while !cursor.std_remaining_slice().is_empty() {
            if cursor.std_remaining_slice().len() < 4 {
                return Err(EchError::MalformedConfig {
                    reason: "trailing bytes inside declared list length",
                });
            }

            // the window starts 4 bytes before the content, taking in
            // the version and length fields
            let encoding_start = 2 + cursor.position() as usize;

            let version_raw = cursor.read_u16::<BigEndian>()?;
            trace!("ECHConfig version = 0x{:04x}", version_raw);
            let content_length = cursor.read_u16::<BigEndian>()?;
            trace!("ECHConfig length  = {}", content_length);
            if usize::from(content_length) > cursor.std_remaining_slice().len() {
                return Err(EchError::MalformedConfig {
                    reason: "config content overruns list",
                });
            }

            let version = match EchVersion::try_from(version_raw) {
                Ok(v) => v,
                Err(_) => {
                    debug!("skipping ECHConfig of unknown version 0x{:04x}", version_raw);
                    let mut skipped = vec![0u8; usize::from(content_length)];
                    cursor.read_exact(&mut skipped)?;
                    continue;
                }
            };

            let mut config = cursor.with_truncated(u64::from(content_length), |cursor, _| {
                let config = EchConfig::read_body(version, cursor)?;
                if !cursor.std_remaining_slice().is_empty() {
                    return Err(EchError::MalformedConfig {
                        reason: "trailing bytes inside config content",
                    });
                }
                Ok(config)
            })?;
            config.encoding_start = encoding_start;
            config.encoding_length = usize::from(content_length) + 4;
            configs.push(config);
        }
        Ok(configs)
    }
}

impl EchConfig {
    /// Parses a version-specific config body. The two accepted drafts
    /// carry the same fields in different orders.
    fn read_body(version: EchVersion, cursor: &mut Cursor<&[u8]>) -> Result<Self, EchError> {
        let (config_id, kem_id, public_key, cipher_suites, maximum_name_length, public_name) =
            match version {
                EchVersion::Draft10 => {
                    let config_id = cursor.read_u8()?;
                    trace!("config_id = {}", config_id);
                    let kem_id = HpkeKemId::from(cursor.read_u16::<BigEndian>()?);
                    trace!("kem_id = {:?}", kem_id);
                    let public_key = read_vec(cursor, 1..=u16::MAX)?;
                    trace!("public_key (len) = {}", public_key.len());
                    let cipher_suites = read_cipher_suites(cursor)?;
                    let maximum_name_length = cursor.read_u16::<BigEndian>()?;
                    let public_name = PublicName::read_from(cursor)?;
                    (config_id, kem_id, public_key, cipher_suites, maximum_name_length, public_name)
                }
                EchVersion::Draft09 => {
                    let public_name = PublicName::read_from(cursor)?;
                    let public_key = read_vec(cursor, 1..=u16::MAX)?;
                    trace!("public_key (len) = {}", public_key.len());
                    let kem_id = HpkeKemId::from(cursor.read_u16::<BigEndian>()?);
                    trace!("kem_id = {:?}", kem_id);
                    let cipher_suites = read_cipher_suites(cursor)?;
                    let maximum_name_length = cursor.read_u16::<BigEndian>()?;
                    (0, kem_id, public_key, cipher_suites, maximum_name_length, public_name)
                }
            };
        let extensions = read_config_extensions(cursor)?;

        Ok(Self {
            version,
            config_id,
            kem_id,
            public_key,
            cipher_suites,
            maximum_name_length,
            public_name,
            extensions,
            // indices are filled in by the list decoder
            encoding_start: 0,
            encoding_length: 0,
        })
    }
}

fn read_cipher_suites(cursor: &mut Cursor<&[u8]>) -> Result<Vec<HpkeSymmetricCipherSuite>, EchError> {
    let suites_len = cursor.read_u16::<BigEndian>()?;
    trace!("cipher_suites len = {}", suites_len);
    if suites_len == 0 || suites_len % 4 != 0 {
        return Err(EchError::MalformedConfig {
            reason: "cipher_suites length must be a positive multiple of 4",
        });
    }
    let mut suites = Vec::with_capacity(usize::from(suites_len / 4));
    cursor.with_truncated(u64::from(suites_len), |cursor, _| -> io::Result<()> {
        while !cursor.std_remaining_slice().is_empty() {
            let suite = HpkeSymmetricCipherSuite::read_from(cursor)?;
            trace!("suite = {:?}", suite);
            suites.push(suite);
        }
        Ok(())
    })?;
    Ok(suites)
}

fn read_config_extensions(cursor: &mut Cursor<&[u8]>) -> Result<Vec<EchConfigExtension>, EchError> {
    let extensions_len = cursor.read_u16::<BigEndian>()?;
    trace!("extensions len = {}", extensions_len);
    let mut extensions = Vec::new();
    cursor.with_truncated(u64::from(extensions_len), |cursor, _| -> Result<(), EchError> {
        while !cursor.std_remaining_slice().is_empty() {
            let ext_type = cursor.read_u16::<BigEndian>()?;
            let body = read_vec(cursor, 0..=u16::MAX)?;
            if body.len() >= usize::from(MAX_ECHCONFIGLIST_LEN) {
                return Err(EchError::MalformedConfig {
                    reason: "extension value too long",
                });
            }
            trace!("config extension 0x{:04x}, {} bytes", ext_type, body.len());
            extensions.push(EchConfigExtension { ext_type, body });
        }
        Ok(())
    })?;
    Ok(extensions)
}

/// Decodes a `;`-separated concatenation of textual fragments and glues
/// the binary results together.
fn decode_fragments(
    input: &[u8],
    decode: impl Fn(&[u8]) -> Result<Vec<u8>, EchError>,
) -> Result<Vec<u8>, EchError> {
    let mut binary = Vec::new();
    for fragment in input.split(|b| *b == b';') {
        if fragment.is_empty() {
            continue;
        }
        binary.extend(decode(fragment)?);
    }
    Ok(binary)
}

/// Pulls the base64 value following an `ech=` marker out of
/// presentation-form HTTPS/SVCB data and decodes it.
fn ech_value_from_presentation(input: &[u8]) -> Result<Vec<u8>, EchError> {
    let at = input.windows(4).position(|w| w == b"ech=")
        .ok_or(EchError::MalformedConfig { reason: "no ech= parameter" })?;
    let value = &input[at + 4..];
    let end = value.iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'"')
        .unwrap_or(value.len());
    base64::decode(&value[..end])
        .map_err(|_| EchError::MalformedConfig { reason: "invalid base64 after ech=" })
}

/// Walks SVCB/HTTPS wire RData looking for the `ech` SvcParam. An
/// absent parameter is not an error; there is just nothing to decode.
pub fn ech_from_svcb_rdata(rdata: &[u8]) -> Result<Option<Vec<u8>>, EchError> {
    let mut cursor = Cursor::new(rdata);
    let priority = cursor.read_u16::<BigEndian>()?;
    trace!("SvcPriority = {}", priority);
    skip_dns_name(&mut cursor)?;

    while !cursor.std_remaining_slice().is_empty() {
        let key = cursor.read_u16::<BigEndian>()?;
        let value = read_vec(&mut cursor, 0..=u16::MAX)?;
        trace!("SvcParamKey {} with {} value bytes", key, value.len());
        if key == SVC_PARAM_ECH {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Skips over an uncompressed DNS-encoded name. A compression pointer
/// terminates the name in two bytes, so it is tolerated.
fn skip_dns_name(cursor: &mut Cursor<&[u8]>) -> Result<(), EchError> {
    loop {
        let len = cursor.read_u8()?;
        if len == 0 {
            return Ok(());
        }
        if len & 0b_1100_0000 == 0b_1100_0000 {
            let _ = cursor.read_u8()?;
            return Ok(());
        }
        let mut label = vec![0u8; usize::from(len)];
        cursor.read_exact(&mut label)?;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::{HpkeAeadId, HpkeKdfId};
    use pretty_assertions::assert_eq;

    fn sample_list() -> Vec<u8> {
        let mut buf = vec![
            0, 64, // echconfiglist: len = 64
            0xfe, 0x0a, // config version: draft-10
            0, 60, // config len
            0x2a, // config id
            0, 0x20, // kem id: x25519
            0, 32, // public key len
        ];
        buf.extend([0xab; 32]); // public key
        buf.extend([
            0, 4, // cipher suites len
            0, 1, 0, 1, // hkdf-sha256 / aes-128-gcm
            0, 64, // maximum name length
            0, 11, // public name len
            101, 120, 97, 109, 112, 108, 101, 46, 99, 111, 109, // example.com
            0, 0, // extensions len
        ]);
        buf
    }

    #[test]
    fn roundtrip_draft10() {
        crate::init_logs();
        let buf = sample_list();
        let (list, leftover) = EchConfigList::from_binary(&buf).unwrap();
        assert!(leftover.is_empty());
        assert_eq!(list.len(), 1);

        let config = list.single().unwrap();
        assert_eq!(config.version, EchVersion::Draft10);
        assert_eq!(config.config_id, 0x2a);
        assert_eq!(config.kem_id, HpkeKemId::DHKEM_X25519_HKDF_SHA256);
        assert_eq!(config.public_key, vec![0xab; 32]);
        assert_eq!(config.cipher_suites, vec![HpkeSymmetricCipherSuite {
            kdf_id: HpkeKdfId::HKDF_SHA256,
            aead_id: HpkeAeadId::AES_128_GCM,
        }]);
        assert_eq!(config.maximum_name_length, 64);
        assert_eq!(config.public_name, PublicName(b"example.com".to_vec()));
        assert_eq!(config.extensions, vec![]);

        // the by-reference window reproduces the wire bytes exactly
        assert_eq!(list.encoding(0), &buf[2..]);
        assert_eq!(list.raw(), &buf[..]);
    }

    #[test]
    fn draft09_field_order() {
        crate::init_logs();
        let mut buf = vec![
            0, 62, // echconfiglist: len = 62
            0xfe, 0x09, // config version: draft-09
            0, 58, // config len
            0, 11, // public name len
            101, 120, 97, 109, 112, 108, 101, 46, 99, 111, 109, // example.com
            0, 32, // public key len
        ];
        buf.extend([0xcd; 32]);
        buf.extend([
            0, 0x20, // kem id
            0, 4, // cipher suites len
            0, 1, 0, 3, // hkdf-sha256 / chacha20-poly1305
            0, 32, // maximum name length
            0, 0, // extensions len
        ]);

        let (list, leftover) = EchConfigList::from_binary(&buf).unwrap();
        assert!(leftover.is_empty());
        let config = list.single().unwrap();
        assert_eq!(config.version, EchVersion::Draft09);
        assert_eq!(config.config_id, 0);
        assert_eq!(config.kem_id, HpkeKemId::DHKEM_X25519_HKDF_SHA256);
        assert_eq!(config.public_name, PublicName(b"example.com".to_vec()));
        assert_eq!(config.cipher_suites[0].aead_id, HpkeAeadId::ChaCha20Poly1305);
    }

    #[test]
    fn unknown_versions_are_skipped() {
        crate::init_logs();
        let buf = &[
            0, 10, // echconfiglist: len = 10
            0xfe, 0x0d, // draft-13, which this implementation predates
            0, 6, // config len
            1, 2, 3, 4, 5, 6, // opaque content
        ];
        let (list, leftover) = EchConfigList::from_binary(buf).unwrap();
        assert!(leftover.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn leftover_bytes_are_returned() {
        crate::init_logs();
        let mut buf = sample_list();
        buf.extend(sample_list());
        let (_, leftover) = EchConfigList::from_binary(&buf).unwrap();
        assert_eq!(leftover, &sample_list()[..]);

        let lists = EchConfigList::read_all(&buf).unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0], lists[1]);
    }

    #[test]
    fn length_bounds() {
        crate::init_logs();
        // declared length below the minimum
        assert_eq!(
            EchConfigList::from_binary(&[0, 9, 1, 2, 3, 4, 5, 6, 7, 8, 9]),
            Err(EchError::MalformedConfig { reason: "list length out of range" }),
        );
        // declared length beyond the input
        assert_eq!(
            EchConfigList::from_binary(&[0, 64, 0xfe, 0x0a]),
            Err(EchError::MalformedConfig { reason: "list length exceeds input" }),
        );
    }

    #[test]
    fn garbage_within_declared_length() {
        crate::init_logs();
        let mut buf = sample_list();
        // grow the declared list length past the config, leaving three
        // stray bytes that cannot form another config header
        buf[1] += 3;
        buf.extend([0xff, 0xff, 0xff]);
        assert_eq!(
            EchConfigList::from_binary(&buf),
            Err(EchError::MalformedConfig { reason: "trailing bytes inside declared list length" }),
        );
    }

    #[test]
    fn suites_must_be_multiple_of_four() {
        crate::init_logs();
        let mut buf = sample_list();
        // shrink: suites len 4 -> 2 is no longer a multiple of 4
        buf[44] = 2;
        assert!(matches!(
            EchConfigList::from_binary(&buf),
            Err(EchError::MalformedConfig { .. }),
        ));
    }

    #[test]
    fn guesses_formats() {
        crate::init_logs();
        assert_eq!(guess_format(b"3082aabb"), GuessedFormat::AsciiHex);
        assert_eq!(guess_format(b"AEP/CQBDqg=="), GuessedFormat::B64Txt);
        assert_eq!(guess_format(b"\x00\x43\xfe\x0a\x00\x3f"), GuessedFormat::Bin);
        assert_eq!(guess_format(b"1 . alpn=h2 ech=AEP"), GuessedFormat::HttpsSvc);
        // all-hex text is hex, not base64
        assert_eq!(guess_format(b"abcdef01;abcdef01"), GuessedFormat::AsciiHex);
    }

    #[test]
    fn multi_value_hex_transport() {
        crate::init_logs();
        let one = hex::encode(sample_list());
        let joined = format!("{};{}", one, one);
        let lists = EchConfigList::from_input(joined.as_bytes()).unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].len(), 1);
    }

    #[test]
    fn base64_transport() {
        crate::init_logs();
        let text = base64::encode(sample_list());
        let lists = EchConfigList::from_input(text.as_bytes()).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(
            lists[0].single().unwrap().public_name,
            PublicName(b"example.com".to_vec()),
        );
        assert_eq!(EchConfigList::from_base64(&text).unwrap(), lists[0]);
    }

    #[test]
    fn ech_param_in_presentation_data() {
        crate::init_logs();
        let text = format!("1 . alpn=h2 ech={} ipv4hint=192.0.2.1", base64::encode(sample_list()));
        let lists = EchConfigList::from_input(text.as_bytes()).unwrap();
        assert_eq!(lists.len(), 1);
    }

    #[test]
    fn svcb_rdata_with_ech() {
        crate::init_logs();
        let list = sample_list();
        let mut buf = vec![
            0, 1, // priority: 1
            0x00, // target: .
            0, 1, // param: alpn
            0, 3, // param len = 3
            2, 104, 50, // "h2"
            0, 5, // param: ech
        ];
        buf.extend((list.len() as u16).to_be_bytes());
        buf.extend(&list);
        buf.extend([
            0, 3, // param: port
            0, 2, // param len = 2
            0x01, 0xbb, // 443
        ]);

        assert_eq!(ech_from_svcb_rdata(&buf).unwrap(), Some(list));
    }

    #[test]
    fn svcb_rdata_without_ech() {
        crate::init_logs();
        let buf = &[
            0, 1, // priority
            3, 102, 111, 111, 7, 101, 120, 97, 109, 112, 108, 101, 3, 99, 111, 109, 0, // foo.example.com.
            0, 3, // param: port
            0, 2, // param len
            0x01, 0xbb, // 443
        ];
        assert_eq!(ech_from_svcb_rdata(buf).unwrap(), None);
    }
}
