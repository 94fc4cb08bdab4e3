//! The identifier registries ECH draws on: ECHConfig versions, HPKE
//! algorithm ids, and the TLS extension-type numbers this crate needs to
//! recognise.

use std::io::{self, Cursor};
use std::str::FromStr;

use byteorder::{BigEndian, ReadBytesExt};

use crate::cursor::{put_u16, ReadFromCursor};

u16_enum! {
    /// ECHConfig versions this implementation understands. Other
    /// versions are skipped during list decoding, not rejected.
    #[derive(Copy, Eq)]
    pub enum EchVersion {
        /// Legacy. Decoded for compatibility, never emitted.
        Draft09 = 0xfe09,
        /// The version this implementation selects and emits.
        Draft10 = 0xfe0a,
    }
}

u16_enum! {
    /// RFC 9180 section 7.1, Key Encapsulation Mechanisms (KEMs)
    #[allow(non_camel_case_types)]
    #[derive(Copy, Eq)]
    pub enum HpkeKemId {
        Reserved = 0x0000,
        DHKEM_P256_HKDF_SHA256 = 0x0010,
        DHKEM_P384_HKDF_SHA384 = 0x0011,
        DHKEM_P521_HKDF_SHA512 = 0x0012,
        DHKEM_X25519_HKDF_SHA256 = 0x0020,
        DHKEM_X448_HKDF_SHA512 = 0x0021,
        @unknown Unknown(u16),
    }
}

impl HpkeKemId {
    /// The length of an encapsulated share (and of a public key) under
    /// this KEM. GREASE needs this even for KEMs it cannot run.
    pub fn enc_len(self) -> Option<usize> {
        match self {
            Self::DHKEM_P256_HKDF_SHA256 => Some(65),
            Self::DHKEM_P384_HKDF_SHA384 => Some(97),
            Self::DHKEM_P521_HKDF_SHA512 => Some(133),
            Self::DHKEM_X25519_HKDF_SHA256 => Some(32),
            Self::DHKEM_X448_HKDF_SHA512 => Some(56),
            Self::Reserved | Self::Unknown(_) => None,
        }
    }
}

u16_enum! {
    /// RFC 9180 section 7.2, Key Derivation Functions (KDFs)
    #[allow(non_camel_case_types)]
    #[derive(Copy, Eq)]
    pub enum HpkeKdfId {
        Reserved = 0,
        HKDF_SHA256 = 1,
        HKDF_SHA384 = 2,
        HKDF_SHA512 = 3,
        @unknown Unknown(u16),
    }
}

u16_enum! {
    /// RFC 9180 section 7.3, AEAD functions
    #[allow(non_camel_case_types)]
    #[derive(Copy, Eq)]
    pub enum HpkeAeadId {
        Reserved = 0,
        AES_128_GCM = 1,
        AES_256_GCM = 2,
        ChaCha20Poly1305 = 3,
        @unknown Unknown(u16),
        ExportOnly = 0xffff,
    }
}

/// A (kdf, aead) pair as published in an ECHConfig and echoed back in
/// the ECH extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HpkeSymmetricCipherSuite {
    pub kdf_id: HpkeKdfId,
    pub aead_id: HpkeAeadId,
}

impl ReadFromCursor for HpkeSymmetricCipherSuite {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            kdf_id: cursor.read_u16::<BigEndian>()?.into(),
            aead_id: cursor.read_u16::<BigEndian>()?.into(),
        })
    }
}

impl HpkeSymmetricCipherSuite {
    pub fn write_to(self, out: &mut Vec<u8>) -> io::Result<()> {
        put_u16(out, self.kdf_id.into())?;
        put_u16(out, self.aead_id.into())
    }
}

/// Parses the textual form used by the `grease_suite` option: two
/// comma-separated identifiers, each a registered name or a number
/// (`hkdf-sha256,aes-128-gcm`, or `0x1,0x1`).
impl FromStr for HpkeSymmetricCipherSuite {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kdf, aead) = s.split_once(',')
            .ok_or("expected two comma-separated identifiers")?;

        let kdf_id = match kdf.trim() {
            "hkdf-sha256" => HpkeKdfId::HKDF_SHA256,
            "hkdf-sha384" => HpkeKdfId::HKDF_SHA384,
            "hkdf-sha512" => HpkeKdfId::HKDF_SHA512,
            other => HpkeKdfId::from(parse_id(other)?),
        };
        let aead_id = match aead.trim() {
            "aes-128-gcm" => HpkeAeadId::AES_128_GCM,
            "aes-256-gcm" => HpkeAeadId::AES_256_GCM,
            "chacha20-poly1305" => HpkeAeadId::ChaCha20Poly1305,
            other => HpkeAeadId::from(parse_id(other)?),
        };
        Ok(Self { kdf_id, aead_id })
    }
}

fn parse_id(text: &str) -> Result<u16, &'static str> {
    let parsed = match text.strip_prefix("0x") {
        Some(hexits) => u16::from_str_radix(hexits, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| "identifier is neither a known name nor a number")
}

u16_enum! {
    /// TLS extension types, as found in a ClientHello.
    #[derive(Copy, Eq, PartialOrd, Ord, Hash)]
    pub enum ExtensionType {
        ServerName = 0,                           /* RFC 6066 */
        MaxFragmentLength = 1,                    /* RFC 6066 */
        StatusRequest = 5,                        /* RFC 6066 */
        SupportedGroups = 10,                     /* RFC 8422, 7919 */
        SignatureAlgorithms = 13,                 /* RFC 8446 */
        UseSrtp = 14,                             /* RFC 5764 */
        Heartbeat = 15,                           /* RFC 6520 */
        ApplicationLayerProtocolNegotiation = 16, /* RFC 7301 */
        SignedCertificateTimestamp = 18,          /* RFC 6962 */
        ClientCertificateType = 19,               /* RFC 7250 */
        ServerCertificateType = 20,               /* RFC 7250 */
        Padding = 21,                             /* RFC 7685 */
        PreSharedKey = 41,                        /* RFC 8446 */
        EarlyData = 42,                           /* RFC 8446 */
        SupportedVersions = 43,                   /* RFC 8446 */
        Cookie = 44,                              /* RFC 8446 */
        PskKeyExchangeModes = 45,                 /* RFC 8446 */
        CertificateAuthorities = 47,              /* RFC 8446 */
        OidFilters = 48,                          /* RFC 8446 */
        PostHandshakeAuth = 49,                   /* RFC 8446 */
        SignatureAlgorithmsCert = 50,             /* RFC 8446 */
        KeyShare = 51,                            /* RFC 8446 */
        // The ECH extension itself, and the compression reference that
        // may stand in for extensions inside the encrypted inner hello
        EncryptedClientHello = 0xfe0a,
        EchOuterExtensions = 0xfd00,
        @unknown Other(u16),
    }
}

/// Shortest ECHConfigList the decoder will consider.
pub const MIN_ECHCONFIGLIST_LEN: u16 = 10;

/// Longest, exclusive. Also bounds a single ECHConfig extension value
/// and the whole PEM key container.
pub const MAX_ECHCONFIGLIST_LEN: u16 = 1500;

/// Longest encapsulated share the server parser will accept.
pub const MAX_ECH_ENC_LEN: usize = 1024;

/// Longest ECH payload the server parser will accept.
pub const MAX_ECH_PAYLOAD_LEN: usize = 16 * 1024;

/// Ciphertext length used for GREASE ECH extensions, chosen to sit in
/// the same range as real payloads under the default padding.
pub const GREASE_CIPHERTEXT_LEN: usize = 0x1d3;

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_map_both_ways() {
        assert_eq!(HpkeKemId::from(0x20u16), HpkeKemId::DHKEM_X25519_HKDF_SHA256);
        assert_eq!(u16::from(HpkeKemId::DHKEM_X25519_HKDF_SHA256), 0x20);
        assert_eq!(HpkeKemId::from(0x9999u16), HpkeKemId::Unknown(0x9999));
        assert_eq!(u16::from(HpkeKemId::Unknown(0x9999)), 0x9999);
        assert_eq!(u16::from(ExtensionType::EncryptedClientHello), 0xfe0a);
    }

    #[test]
    fn suite_from_names() {
        assert_eq!(
            "hkdf-sha256,chacha20-poly1305".parse(),
            Ok(HpkeSymmetricCipherSuite {
                kdf_id: HpkeKdfId::HKDF_SHA256,
                aead_id: HpkeAeadId::ChaCha20Poly1305,
            })
        );
    }

    #[test]
    fn suite_from_numbers() {
        assert_eq!(
            "0x2,1".parse(),
            Ok(HpkeSymmetricCipherSuite {
                kdf_id: HpkeKdfId::HKDF_SHA384,
                aead_id: HpkeAeadId::AES_128_GCM,
            })
        );
    }

    #[test]
    fn suite_rejects_junk() {
        assert!(HpkeSymmetricCipherSuite::from_str("aes-128-gcm").is_err());
        assert!(HpkeSymmetricCipherSuite::from_str("what,ever").is_err());
    }
}
