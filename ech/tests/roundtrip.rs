//! Whole-protocol tests: a client seals an inner hello, a server gets
//! it back out bit-identically, and the confirmation machinery agrees
//! about what happened.

use ech::client::{assemble, assemble_grease, check_server_accept};
use ech::confirm::{install_confirmation, TranscriptHash};
use ech::encoded::CompressionPolicy;
use ech::grease::grease_ech_extension;
use ech::hello::{sni_extension_body, ClientHello, HelloExtension};
use ech::hpke::generate_key_pair;
use ech::ids::ExtensionType;
use ech::server::{decrypt_outer, parse_ech_extension, split_mode_decrypt, ServerDecrypt, ServerKey, SplitOutcome};
use ech::{EchConfigList, EchOptions, EchSession, EchState, HelloView, HpkeKemId};

use pretty_assertions::assert_eq;

fn init_logs() {
    use std::sync::Once;
    static LOG_INIT: Once = Once::new();
    LOG_INIT.call_once(|| {
        env_logger::init();
    });
}

fn test_list(public_key: &[u8], public_name: &str, config_id: u8) -> Vec<u8> {
    let mut content = vec![config_id];
    content.extend([0, 0x20]); // kem: x25519
    content.extend((public_key.len() as u16).to_be_bytes());
    content.extend(public_key);
    content.extend([0, 8, 0, 1, 0, 1, 0, 1, 0, 3]); // aes-128-gcm and chacha
    content.extend([0, 64]); // maximum name length
    content.extend((public_name.len() as u16).to_be_bytes());
    content.extend(public_name.as_bytes());
    content.extend([0, 0]); // no extensions

    let mut buf = Vec::new();
    buf.extend(((content.len() + 4) as u16).to_be_bytes());
    buf.extend([0xfe, 0x0a]);
    buf.extend((content.len() as u16).to_be_bytes());
    buf.extend(content);
    buf
}

fn inner_hello() -> ClientHello {
    ClientHello {
        legacy_version: 0x0303,
        random: [0x11; 32],
        session_id: vec![0x22; 32],
        cipher_suites: vec![0x1301, 0x1302],
        compression_methods: vec![0],
        extensions: vec![
            HelloExtension::new(ExtensionType::ServerName, sni_extension_body("secret.example").unwrap()),
            HelloExtension::new(ExtensionType::SupportedGroups, vec![0, 2, 0, 29]),
            HelloExtension::new(ExtensionType::KeyShare, vec![0x55; 38]),
            HelloExtension::new(ExtensionType::SignatureAlgorithms, vec![0, 2, 4, 3]),
        ],
    }
}

fn compressing_policy() -> CompressionPolicy {
    CompressionPolicy::new()
        .compress(ExtensionType::SupportedGroups)
        .compress(ExtensionType::KeyShare)
}

#[test]
fn client_to_server_roundtrip() {
    init_logs();
    let (sk, pk) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let lists = EchConfigList::from_input(&test_list(&pk, "cover.example", 0x11)).unwrap();
    let inner = inner_hello();

    let mut client = EchSession::new();
    let assembled = assemble(
        &mut client,
        &lists[0],
        &inner,
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();

    let keys = [ServerKey {
        config_id: 0x11,
        kem_id: HpkeKemId::DHKEM_X25519_HKDF_SHA256,
        config_encoding: lists[0].encoding(0),
        private_key: &sk,
    }];

    let mut server = EchSession::new();
    let outcome = decrypt_outer(&mut server, &assembled.outer_body, &keys, false).unwrap();

    // the server recovers the inner hello bit-identically
    match outcome {
        ServerDecrypt::Accepted { inner: recovered, outer_only } => {
            assert_eq!(recovered, inner);
            assert_eq!(outer_only, vec![ExtensionType::SupportedGroups, ExtensionType::KeyShare]);
        }
        other => panic!("expected acceptance, got {:?}", other),
    }

    assert_eq!(server.status(), EchState::Success);
    assert_eq!(server.view(), HelloView::Inner);
    assert_eq!(server.inner_name, Some("secret.example".to_owned()));
    assert_eq!(server.outer_name, Some("cover.example".to_owned()));
    assert_eq!(server.inner_hello, Some(inner.to_handshake().unwrap()));
    assert_eq!(server.session_id, inner.session_id);
}

#[test]
fn wrong_config_id_greases_without_trial() {
    init_logs();
    let (_, pk) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let (other_sk, _) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let lists = EchConfigList::from_input(&test_list(&pk, "cover.example", 0x11)).unwrap();

    let mut client = EchSession::new();
    let assembled = assemble(
        &mut client,
        &lists[0],
        &inner_hello(),
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();

    // the stored key answers to a different config_id entirely
    let other_list = test_list(&[0xab; 32], "cover.example", 0x22);
    let other_lists = EchConfigList::from_input(&other_list).unwrap();
    let keys = [ServerKey {
        config_id: 0x22,
        kem_id: HpkeKemId::DHKEM_X25519_HKDF_SHA256,
        config_encoding: other_lists[0].encoding(0),
        private_key: &other_sk,
    }];

    let mut server = EchSession::new();
    let outcome = decrypt_outer(&mut server, &assembled.outer_body, &keys, false).unwrap();
    assert_eq!(outcome, ServerDecrypt::Grease);
    assert_eq!(server.status(), EchState::Grease);
    // the cover name still routes the handshake
    assert_eq!(server.outer_name, Some("cover.example".to_owned()));
}

#[test]
fn trial_decryption_rescues_a_mislabelled_key() {
    init_logs();
    let (sk, pk) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let (decoy_sk, _) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let lists = EchConfigList::from_input(&test_list(&pk, "cover.example", 0x11)).unwrap();
    let inner = inner_hello();

    let mut client = EchSession::new();
    let assembled = assemble(
        &mut client,
        &lists[0],
        &inner,
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();

    // neither stored config_id matches the extension; only trial
    // decryption reaches the second key
    let decoy_list = test_list(&[0xab; 32], "cover.example", 0x99);
    let decoy_lists = EchConfigList::from_input(&decoy_list).unwrap();
    let keys = [
        ServerKey {
            config_id: 0x99,
            kem_id: HpkeKemId::DHKEM_X25519_HKDF_SHA256,
            config_encoding: decoy_lists[0].encoding(0),
            private_key: &decoy_sk,
        },
        ServerKey {
            config_id: 0x77,
            kem_id: HpkeKemId::DHKEM_X25519_HKDF_SHA256,
            config_encoding: lists[0].encoding(0),
            private_key: &sk,
        },
    ];

    let mut without_trial = EchSession::new();
    assert_eq!(
        decrypt_outer(&mut without_trial, &assembled.outer_body, &keys, false).unwrap(),
        ServerDecrypt::Grease,
    );

    let mut with_trial = EchSession::new();
    match decrypt_outer(&mut with_trial, &assembled.outer_body, &keys, true).unwrap() {
        ServerDecrypt::Accepted { inner: recovered, .. } => assert_eq!(recovered, inner),
        other => panic!("expected acceptance, got {:?}", other),
    }
}

#[test]
fn accept_confirmation_settles_both_sessions() {
    init_logs();
    let (sk, pk) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let lists = EchConfigList::from_input(&test_list(&pk, "cover.example", 0x11)).unwrap();
    let inner = inner_hello();

    let mut client = EchSession::new();
    let assembled = assemble(
        &mut client,
        &lists[0],
        &inner,
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();

    let keys = [ServerKey {
        config_id: 0x11,
        kem_id: HpkeKemId::DHKEM_X25519_HKDF_SHA256,
        config_encoding: lists[0].encoding(0),
        private_key: &sk,
    }];
    let mut server = EchSession::new();
    decrypt_outer(&mut server, &assembled.outer_body, &keys, false).unwrap();

    // the server stamps its ServerHello; the client checks it
    let handshake_secret = [7_u8; 32];
    let mut server_hello = vec![0_u8; 60];
    server_hello[0] = 2; // HandshakeType server_hello
    let inner_handshake = server.inner_hello.clone().unwrap();
    install_confirmation(TranscriptHash::Sha256, &handshake_secret, &inner_handshake, &mut server_hello).unwrap();

    assert!(check_server_accept(&mut client, TranscriptHash::Sha256, &handshake_secret, &server_hello).unwrap());
    assert_eq!(client.status(), EchState::Success);

    // a client that expected a different transcript ends up failed
    let mut other_client = EchSession::new();
    let mut other_inner = inner.clone();
    other_inner.random = [0x99; 32];
    assemble(
        &mut other_client,
        &lists[0],
        &other_inner,
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();
    assert!(!check_server_accept(&mut other_client, TranscriptHash::Sha256, &handshake_secret, &server_hello).unwrap());
    assert_eq!(other_client.status(), EchState::Failed);
}

#[test]
fn grease_parses_like_the_real_thing() {
    init_logs();
    let (_, pk) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let lists = EchConfigList::from_input(&test_list(&pk, "cover.example", 0x11)).unwrap();

    let mut client = EchSession::new();
    let assembled = assemble(
        &mut client,
        &lists[0],
        &inner_hello(),
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();
    let outer = ClientHello::from_body(&assembled.outer_body).unwrap();
    let real = parse_ech_extension(
        &outer.extension(ExtensionType::EncryptedClientHello).unwrap().body,
    ).unwrap();

    let grease = parse_ech_extension(
        &grease_ech_extension(HpkeKemId::DHKEM_X25519_HKDF_SHA256, None).unwrap(),
    ).unwrap();

    // same structure, same share length, same suite shape
    assert_eq!(grease.suite, real.suite);
    assert_eq!(grease.enc.len(), real.enc.len());
    assert!(!grease.payload.is_empty());
}

#[test]
fn grease_client_session_terminates_as_grease() {
    init_logs();
    let mut session = EchSession::new();
    let mut outer_body = inner_hello().to_body().unwrap();
    assemble_grease(&mut session, &mut outer_body, &EchOptions::default()).unwrap();
    assert_eq!(session.status(), EchState::Grease);

    // and a keyless server shrugs it off the same way
    let mut server = EchSession::new();
    assert_eq!(decrypt_outer(&mut server, &outer_body, &[], false).unwrap(), ServerDecrypt::Grease);
    assert_eq!(server.status(), EchState::Grease);
}

#[test]
fn split_mode_round_trips_record_framing() {
    init_logs();
    let (sk, pk) = generate_key_pair(HpkeKemId::DHKEM_X25519_HKDF_SHA256).unwrap();
    let lists = EchConfigList::from_input(&test_list(&pk, "cover.example", 0x11)).unwrap();
    let inner = inner_hello();

    let mut client = EchSession::new();
    let assembled = assemble(
        &mut client,
        &lists[0],
        &inner,
        &compressing_policy(),
        &EchOptions::default(),
    ).unwrap();

    // frame the outer as a TLS plaintext record, the way a front-end
    // proxy would see it
    let mut message = vec![1];
    message.extend(((assembled.outer_body.len()) as u32).to_be_bytes()[1..].iter());
    message.extend(&assembled.outer_body);
    let mut record = vec![0x16, 0x03, 0x01];
    record.extend((message.len() as u16).to_be_bytes());
    record.extend(&message);

    let keys = [ServerKey {
        config_id: 0x11,
        kem_id: HpkeKemId::DHKEM_X25519_HKDF_SHA256,
        config_encoding: lists[0].encoding(0),
        private_key: &sk,
    }];

    match split_mode_decrypt(&record, &keys, false).unwrap() {
        SplitOutcome::Inner { hello, inner_sni, outer_sni } => {
            assert_eq!(inner_sni, Some("secret.example".to_owned()));
            assert_eq!(outer_sni, Some("cover.example".to_owned()));
            // the answer is a record too, holding the inner hello
            assert_eq!(hello[0], 0x16);
            assert_eq!(&hello[1..3], &[0x03, 0x01]);
            let recovered = ClientHello::from_handshake(&hello[5..]).unwrap();
            assert_eq!(recovered, inner);
        }
        other => panic!("expected an inner hello, got {:?}", other),
    }

    // no ech extension at all: reported as such, with the outer sni
    let mut plain = inner.clone();
    plain.set_extension(ExtensionType::ServerName, sni_extension_body("plain.example").unwrap());
    let plain_msg = plain.to_handshake().unwrap();
    match split_mode_decrypt(&plain_msg, &keys, false).unwrap() {
        SplitOutcome::NotPresent { outer_sni } => {
            assert_eq!(outer_sni, Some("plain.example".to_owned()));
        }
        other => panic!("expected not-present, got {:?}", other),
    }
}
