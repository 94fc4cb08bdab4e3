//! GREASE ECH: a well-formed extension full of random bytes, emitted
//! by clients that have no real config so that the presence of the
//! extension says nothing about whether ECH is in use.

use std::io;

use log::*;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::cursor::{put_u8, put_opaque16};
use crate::ids::{
    HpkeAeadId, HpkeKdfId, HpkeKemId, HpkeSymmetricCipherSuite, GREASE_CIPHERTEXT_LEN,
};

/// The suite advertised when the caller pins nothing.
pub const DEFAULT_GREASE_SUITE: HpkeSymmetricCipherSuite = HpkeSymmetricCipherSuite {
    kdf_id: HpkeKdfId::HKDF_SHA256,
    aead_id: HpkeAeadId::AES_128_GCM,
};

/// Builds the body of a GREASE ECH extension: a random config_id, an
/// `enc` of the right length for the KEM, and a fixed-length random
/// ciphertext. The KEM is never run; only its share length matters.
pub fn grease_ech_extension(
    kem_id: HpkeKemId,
    suite: Option<HpkeSymmetricCipherSuite>,
) -> io::Result<Vec<u8>> {
    let suite = suite.unwrap_or(DEFAULT_GREASE_SUITE);
    let enc_len = match kem_id.enc_len() {
        Some(len) => len,
        None => {
            debug!("greasing with the x25519 share length for {:?}", kem_id);
            32
        }
    };

    let mut rng = StdRng::from_os_rng();
    let config_id: u8 = rng.random();
    let mut enc = vec![0_u8; enc_len];
    rng.fill_bytes(&mut enc);
    let mut ciphertext = vec![0_u8; GREASE_CIPHERTEXT_LEN];
    rng.fill_bytes(&mut ciphertext);

    let mut body = Vec::with_capacity(9 + enc.len() + ciphertext.len());
    suite.write_to(&mut body)?;
    put_u8(&mut body, config_id)?;
    put_opaque16(&mut body, &enc)?;
    put_opaque16(&mut body, &ciphertext)?;
    debug!("grease ech extension: {} bytes, config_id {}", body.len(), config_id);
    Ok(body)
}
