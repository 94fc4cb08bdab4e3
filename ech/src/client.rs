//! The client side: pick a config, seal the inner hello, and splice
//! the resulting extension into the outer.

use log::*;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::confirm::{confirmation_matches, TranscriptHash};
use crate::config::EchConfigList;
use crate::cursor::{put_u8, put_opaque16};
use crate::encoded::{encode_inner, CompressionPolicy, ExtensionAction};
use crate::error::EchError;
use crate::grease::grease_ech_extension;
use crate::hello::{
    alpn_extension_body, append_extension, sni_extension_body, ClientHello,
};
use crate::hpke;
use crate::ids::{EchVersion, ExtensionType, HpkeKemId, HpkeSymmetricCipherSuite};
use crate::session::{EchOptions, EchSession, OuterSni};

/// What [`assemble`] hands back.
#[derive(Debug, PartialEq)]
pub struct AssembledClientHello {
    /// The outer ClientHello body, ECH extension included.
    pub outer_body: Vec<u8>,
    /// Which config of the list was used.
    pub config_index: usize,
    /// The symmetric suite that was used.
    pub suite: HpkeSymmetricCipherSuite,
}

/// Scans a config list for something this build can talk to. A config
/// whose public_name matches the caller’s outer-name override wins;
/// otherwise the first compatible config does.
fn select_config(
    configs: &EchConfigList,
    options: &EchOptions,
) -> Result<(usize, HpkeSymmetricCipherSuite), EchError> {
    let mut fallback = None;
    let mut saw_supported_version = false;

    for (index, config) in configs.configs().iter().enumerate() {
        // draft-09 is decode-tolerant but never emitted against
        if config.version != EchVersion::Draft10 {
            continue;
        }
        saw_supported_version = true;

        let suite = config.cipher_suites.iter().copied()
            .find(|suite| hpke::is_supported(config.kem_id, *suite));
        let suite = match suite {
            Some(suite) => suite,
            None => {
                debug!("config {} offers no runnable suite", index);
                continue;
            }
        };

        if let OuterSni::UseOverride(name) = &options.outer_sni {
            if config.public_name.0 == name.as_bytes() {
                debug!("config {} matches outer name {:?}", index, name);
                return Ok((index, suite));
            }
        }
        if fallback.is_none() {
            fallback = Some((index, suite));
        }
    }

    match fallback {
        Some(found) => Ok(found),
        None if !saw_supported_version => Err(EchError::UnsupportedVersion),
        None => Err(EchError::NoMatchingSuite),
    }
}

/// Seals `inner` under a config from `configs` and returns the outer
/// ClientHello body with the ECH extension spliced in.
///
/// The outer starts life as a copy of the inner, so everything the
/// policy compresses really is present in the outer byte-identically.
/// The random is replaced, the SNI follows the outer-name policy, and
/// the ALPN list follows the `outer_alpn` option.
pub fn assemble(
    session: &mut EchSession,
    configs: &EchConfigList,
    inner: &ClientHello,
    policy: &CompressionPolicy,
    options: &EchOptions,
) -> Result<AssembledClientHello, EchError> {
    session.mark_attempted();
    session.configs = Some(configs.clone());
    session.inner_name = inner.sni()?;
    session.session_id = inner.session_id.clone();

    if policy.action_for(ExtensionType::ServerName) == ExtensionAction::Compress
        || (options.outer_alpn.is_some()
            && policy.action_for(ExtensionType::ApplicationLayerProtocolNegotiation)
                == ExtensionAction::Compress)
    {
        return Err(EchError::BadExtension {
            reason: "cannot compress an extension the outer replaces",
        });
    }

    let (config_index, suite) = select_config(configs, options)?;
    let config = &configs.configs()[config_index];
    info!(
        "sealing inner hello under config {} (config_id {}, {:?})",
        config_index, config.config_id, config.kem_id,
    );

    let encoded = encode_inner(inner, policy)?;

    let mut outer = inner.clone();
    let mut random = [0_u8; 32];
    StdRng::from_os_rng().fill_bytes(&mut random);
    outer.random = random;

    let outer_host = match &options.outer_sni {
        OuterSni::Suppress => None,
        OuterSni::UseOverride(name) => Some(name.clone()),
        OuterSni::UsePublicName => Some(config.public_name.to_string()),
    };
    match &outer_host {
        Some(host) => outer.set_extension(ExtensionType::ServerName, sni_extension_body(host)?),
        None => {
            outer.remove_extension(ExtensionType::ServerName);
        }
    }
    session.outer_name = outer_host;

    if let Some(protocol_list) = &options.outer_alpn {
        outer.set_extension(
            ExtensionType::ApplicationLayerProtocolNegotiation,
            alpn_extension_body(protocol_list)?,
        );
    }

    let mut outer_body = outer.to_body()?;
    let info = hpke::ech_hpke_info(configs.encoding(config_index));
    let sealed = hpke::seal(
        config.kem_id,
        suite,
        &config.public_key,
        &info,
        &encoded.bytes,
        |enc| hpke::ech_aad(suite, config.config_id, enc, &outer_body),
    )?;

    let mut ext_body = Vec::with_capacity(9 + sealed.enc.len() + sealed.ciphertext.len());
    suite.write_to(&mut ext_body)?;
    put_u8(&mut ext_body, config.config_id)?;
    put_opaque16(&mut ext_body, &sealed.enc)?;
    put_opaque16(&mut ext_body, &sealed.ciphertext)?;
    append_extension(&mut outer_body, ExtensionType::EncryptedClientHello, &ext_body)?;

    session.encoded_inner = Some(encoded.bytes);
    session.outer_only = encoded.outer_only;
    session.inner_hello = Some(inner.to_handshake()?);

    Ok(AssembledClientHello { outer_body, config_index, suite })
}

/// The no-config path: splice a GREASE extension into an outer hello
/// built by the ordinary client code.
pub fn assemble_grease(
    session: &mut EchSession,
    outer_body: &mut Vec<u8>,
    options: &EchOptions,
) -> Result<(), EchError> {
    let body = grease_ech_extension(HpkeKemId::DHKEM_X25519_HKDF_SHA256, options.grease_suite)?;
    append_extension(outer_body, ExtensionType::EncryptedClientHello, &body)?;
    session.mark_attempted();
    session.mark_grease();
    Ok(())
}

/// Checks the ServerHello for the accept confirmation and settles the
/// session state. `Ok(false)` is not an error: the handshake simply
/// carries on as ordinary TLS to the outer name.
pub fn check_server_accept(
    session: &mut EchSession,
    hash: TranscriptHash,
    handshake_secret: &[u8],
    server_hello: &[u8],
) -> Result<bool, EchError> {
    let inner_hello = match &session.inner_hello {
        Some(hello) => hello.clone(),
        None => return Err(EchError::AcceptConfirmMismatch),
    };
    if confirmation_matches(hash, handshake_secret, &inner_hello, server_hello)? {
        info!("server honoured the inner hello");
        session.mark_success();
        Ok(true)
    } else {
        warn!("no accept confirmation in ServerHello.random");
        session.mark_failed();
        Ok(false)
    }
}
