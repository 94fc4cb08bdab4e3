//! The HPKE side of ECH: building the "info" and AAD byte strings, and
//! dispatching one-shot Base-mode seal/open onto the rust-hpke
//! implementation for whichever (KEM, KDF, AEAD) triple a config asks
//! for.

// leading `::` everywhere: this module shares its name with the crate
// it wraps
use ::hpke::{aead, kdf, kem};
use ::hpke::kem::Kem;
use ::hpke::{setup_receiver, setup_sender, Deserializable, OpModeR, OpModeS, Serializable};
use log::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cursor::{put_u8, put_u16, put_u24, put_opaque16};
use crate::error::EchError;
use crate::ids::{HpkeAeadId, HpkeKdfId, HpkeKemId, HpkeSymmetricCipherSuite};

/// The label opening the HPKE "info" string. A single zero byte and
/// the verbatim ECHConfig encoding follow it.
pub const ECH_INFO_LABEL: &[u8] = b"tls ech";

/// `"tls ech" · 0x00 · raw ECHConfig encoding` — the encoding runs
/// from the version field through the end of the extensions, the
/// four-byte version+length header included.
pub fn ech_hpke_info(config_encoding: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(8 + config_encoding.len());
    info.extend_from_slice(ECH_INFO_LABEL);
    info.push(0);
    info.extend_from_slice(config_encoding);
    info
}

/// The per-message AAD:
///
/// ```text
/// u16 kdf_id · u16 aead_id · u8 config_id ·
/// u16 enc_len · enc ·
/// u24 outer_len · outer ClientHello body (ECH extension removed)
/// ```
pub fn ech_aad(
    suite: HpkeSymmetricCipherSuite,
    config_id: u8,
    enc: &[u8],
    outer_body: &[u8],
) -> Result<Vec<u8>, EchError> {
    let mut aad = Vec::with_capacity(9 + enc.len() + outer_body.len());
    put_u16(&mut aad, suite.kdf_id.into())?;
    put_u16(&mut aad, suite.aead_id.into())?;
    put_u8(&mut aad, config_id)?;
    put_opaque16(&mut aad, enc)?;
    put_u24(&mut aad, outer_body.len() as u32)?;
    aad.extend_from_slice(outer_body);
    Ok(aad)
}

/// The output of a successful seal.
#[derive(Debug, PartialEq)]
pub struct Sealed {
    /// The encapsulated KEM share to send alongside the ciphertext.
    pub enc: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

// One line per runnable suite. Each consumer declares a `try_suite!`
// that tests the three ids and calls through with the three types.
macro_rules! each_supported_suite {
    ($try:ident) => {
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA256, AES_128_GCM, kem::X25519HkdfSha256, kdf::HkdfSha256, aead::AesGcm128);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA256, AES_256_GCM, kem::X25519HkdfSha256, kdf::HkdfSha256, aead::AesGcm256);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA256, ChaCha20Poly1305, kem::X25519HkdfSha256, kdf::HkdfSha256, aead::ChaCha20Poly1305);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA384, AES_128_GCM, kem::X25519HkdfSha256, kdf::HkdfSha384, aead::AesGcm128);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA384, AES_256_GCM, kem::X25519HkdfSha256, kdf::HkdfSha384, aead::AesGcm256);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA384, ChaCha20Poly1305, kem::X25519HkdfSha256, kdf::HkdfSha384, aead::ChaCha20Poly1305);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA512, AES_128_GCM, kem::X25519HkdfSha256, kdf::HkdfSha512, aead::AesGcm128);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA512, AES_256_GCM, kem::X25519HkdfSha256, kdf::HkdfSha512, aead::AesGcm256);
        $try!(DHKEM_X25519_HKDF_SHA256, HKDF_SHA512, ChaCha20Poly1305, kem::X25519HkdfSha256, kdf::HkdfSha512, aead::ChaCha20Poly1305);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA256, AES_128_GCM, kem::DhP256HkdfSha256, kdf::HkdfSha256, aead::AesGcm128);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA256, AES_256_GCM, kem::DhP256HkdfSha256, kdf::HkdfSha256, aead::AesGcm256);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA256, ChaCha20Poly1305, kem::DhP256HkdfSha256, kdf::HkdfSha256, aead::ChaCha20Poly1305);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA384, AES_128_GCM, kem::DhP256HkdfSha256, kdf::HkdfSha384, aead::AesGcm128);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA384, AES_256_GCM, kem::DhP256HkdfSha256, kdf::HkdfSha384, aead::AesGcm256);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA384, ChaCha20Poly1305, kem::DhP256HkdfSha256, kdf::HkdfSha384, aead::ChaCha20Poly1305);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA512, AES_128_GCM, kem::DhP256HkdfSha256, kdf::HkdfSha512, aead::AesGcm128);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA512, AES_256_GCM, kem::DhP256HkdfSha256, kdf::HkdfSha512, aead::AesGcm256);
        $try!(DHKEM_P256_HKDF_SHA256, HKDF_SHA512, ChaCha20Poly1305, kem::DhP256HkdfSha256, kdf::HkdfSha512, aead::ChaCha20Poly1305);
    };
}

/// Whether this build can run the given KEM and symmetric suite.
pub fn is_supported(kem_id: HpkeKemId, suite: HpkeSymmetricCipherSuite) -> bool {
    macro_rules! try_suite {
        ($kem_id:ident, $kdf_id:ident, $aead_id:ident, $K:ty, $D:ty, $A:ty) => {
            if kem_id == HpkeKemId::$kem_id
                && suite.kdf_id == HpkeKdfId::$kdf_id
                && suite.aead_id == HpkeAeadId::$aead_id {
                return true;
            }
        };
    }
    each_supported_suite!(try_suite);
    false
}

/// Base-mode seal. The AAD includes the encapsulated share, so the
/// caller passes a builder that receives `enc` once the KEM half is
/// done and returns the finished AAD for the AEAD half.
pub fn seal(
    kem_id: HpkeKemId,
    suite: HpkeSymmetricCipherSuite,
    recipient_pub: &[u8],
    info: &[u8],
    plaintext: &[u8],
    aad_for_enc: impl FnOnce(&[u8]) -> Result<Vec<u8>, EchError>,
) -> Result<Sealed, EchError> {
    macro_rules! try_suite {
        ($kem_id:ident, $kdf_id:ident, $aead_id:ident, $K:ty, $D:ty, $A:ty) => {
            if kem_id == HpkeKemId::$kem_id
                && suite.kdf_id == HpkeKdfId::$kdf_id
                && suite.aead_id == HpkeAeadId::$aead_id {
                return seal_with::<$A, $D, $K>(recipient_pub, info, plaintext, aad_for_enc);
            }
        };
    }
    each_supported_suite!(try_suite);
    debug!("no local implementation of {:?} with {:?}", kem_id, suite);
    Err(EchError::NoMatchingSuite)
}

/// Base-mode one-shot open.
pub fn open(
    kem_id: HpkeKemId,
    suite: HpkeSymmetricCipherSuite,
    recipient_priv: &[u8],
    enc: &[u8],
    info: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EchError> {
    macro_rules! try_suite {
        ($kem_id:ident, $kdf_id:ident, $aead_id:ident, $K:ty, $D:ty, $A:ty) => {
            if kem_id == HpkeKemId::$kem_id
                && suite.kdf_id == HpkeKdfId::$kdf_id
                && suite.aead_id == HpkeAeadId::$aead_id {
                return open_with::<$A, $D, $K>(recipient_priv, enc, info, aad, ciphertext);
            }
        };
    }
    each_supported_suite!(try_suite);
    debug!("no local implementation of {:?} with {:?}", kem_id, suite);
    Err(EchError::NoMatchingSuite)
}

/// Generates a fresh keypair for a supported KEM, returning
/// `(private, public)` bytes.
pub fn generate_key_pair(kem_id: HpkeKemId) -> Result<(Vec<u8>, Vec<u8>), EchError> {
    let mut csprng = StdRng::from_os_rng();
    match kem_id {
        HpkeKemId::DHKEM_X25519_HKDF_SHA256 => {
            let (sk, pk) = kem::X25519HkdfSha256::gen_keypair(&mut csprng);
            Ok((sk.to_bytes().to_vec(), pk.to_bytes().to_vec()))
        }
        HpkeKemId::DHKEM_P256_HKDF_SHA256 => {
            let (sk, pk) = kem::DhP256HkdfSha256::gen_keypair(&mut csprng);
            Ok((sk.to_bytes().to_vec(), pk.to_bytes().to_vec()))
        }
        _ => Err(EchError::NoMatchingSuite),
    }
}

fn seal_with<A, D, K>(
    recipient_pub: &[u8],
    info: &[u8],
    plaintext: &[u8],
    aad_for_enc: impl FnOnce(&[u8]) -> Result<Vec<u8>, EchError>,
) -> Result<Sealed, EchError>
where
    A: aead::Aead,
    D: kdf::Kdf,
    K: Kem,
{
    let pk = K::PublicKey::from_bytes(recipient_pub).map_err(|e| {
        debug!("recipient public key did not deserialise: {:?}", e);
        EchError::HpkeFailure
    })?;

    // the ephemeral KEM private key lives inside the context and is
    // dropped with it as soon as this returns
    let mut csprng = StdRng::from_os_rng();
    let (encapped, mut context) =
        setup_sender::<A, D, K, _>(&OpModeS::Base, &pk, info, &mut csprng).map_err(|e| {
            debug!("hpke setup_sender failed: {:?}", e);
            EchError::HpkeFailure
        })?;

    let enc = encapped.to_bytes().to_vec();
    let aad = aad_for_enc(&enc)?;
    let ciphertext = context.seal(plaintext, &aad).map_err(|e| {
        debug!("hpke seal failed: {:?}", e);
        EchError::HpkeFailure
    })?;
    Ok(Sealed { enc, ciphertext })
}

fn open_with<A, D, K>(
    recipient_priv: &[u8],
    enc: &[u8],
    info: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EchError>
where
    A: aead::Aead,
    D: kdf::Kdf,
    K: Kem,
{
    let sk = K::PrivateKey::from_bytes(recipient_priv).map_err(|e| {
        debug!("recipient private key did not deserialise: {:?}", e);
        EchError::HpkeFailure
    })?;
    let encapped = K::EncappedKey::from_bytes(enc).map_err(|e| {
        debug!("encapsulated share did not deserialise: {:?}", e);
        EchError::HpkeFailure
    })?;

    let mut context = setup_receiver::<A, D, K>(&OpModeR::Base, &sk, &encapped, info)
        .map_err(|e| {
            debug!("hpke setup_receiver failed: {:?}", e);
            EchError::HpkeFailure
        })?;
    context.open(ciphertext, aad).map_err(|e| {
        debug!("hpke open failed: {:?}", e);
        EchError::HpkeFailure
    })
}
