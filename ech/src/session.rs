//! Per-handshake ECH state, shared by the client assembler and the
//! server decoder.

use log::*;

use crate::config::EchConfigList;
use crate::ids::{ExtensionType, HpkeSymmetricCipherSuite};

/// Where a handshake stands, ECH-wise. Everything after `Attempted` is
/// terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EchState {
    /// ECH was not configured, or no hello has been built yet.
    NotTried,
    /// A real or GREASE extension went out, or a server started on a
    /// received hello.
    Attempted,
    /// The extension was (or turned out to be) cover traffic. The
    /// handshake carries on to the outer name.
    Grease,
    Success,
    /// The client expected success and did not get it.
    Failed,
    /// The handshake succeeded but the inner name failed certificate
    /// validation.
    BadName,
}

/// What to put in the outer hello’s SNI slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OuterSni {
    /// Use the selected config’s public_name.
    UsePublicName,
    /// Use this name instead.
    UseOverride(String),
    /// Do not send an outer SNI at all.
    Suppress,
}

impl OuterSni {
    /// Maps the application-facing override setting: absent means "use
    /// the public name", empty means "send nothing".
    pub fn from_override(value: Option<&str>) -> Self {
        match value {
            None => Self::UsePublicName,
            Some("") => Self::Suppress,
            Some(name) => Self::UseOverride(name.to_owned()),
        }
    }
}

/// The configuration options the protocol core consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct EchOptions {
    /// Server: on config_id mismatch, try every stored key.
    pub trial_decrypt: bool,
    /// Client: pin the (kdf, aead) pair used for GREASE emission.
    pub grease_suite: Option<HpkeSymmetricCipherSuite>,
    /// Client: wire-formatted ALPN protocol list for the outer hello.
    pub outer_alpn: Option<Vec<u8>>,
    pub outer_sni: OuterSni,
}

impl Default for EchOptions {
    fn default() -> Self {
        Self {
            trial_decrypt: false,
            grease_suite: None,
            outer_alpn: None,
            outer_sni: OuterSni::UsePublicName,
        }
    }
}

/// Which of the two hellos later processing should treat as "the"
/// ClientHello. The server’s post-decryption swap is this tag flipping,
/// not a field-by-field copy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HelloView {
    Outer,
    Inner,
}

/// State for one handshake’s worth of ECH.
#[derive(Debug, Clone, PartialEq)]
pub struct EchSession {
    state: EchState,
    view: HelloView,
    backend: bool,

    /// The name being protected (from the inner hello’s SNI).
    pub inner_name: Option<String>,
    /// The cover name actually sent or received in the clear.
    pub outer_name: Option<String>,
    /// Deep copy of the configs this handshake may use (client side).
    pub configs: Option<EchConfigList>,
    /// The outer legacy_session_id, kept for inner reconstruction.
    pub session_id: Vec<u8>,
    /// The EncodedClientHelloInner that was sealed (client side).
    pub encoded_inner: Option<Vec<u8>>,
    /// The full inner hello as a handshake message: what was protected
    /// (client) or reconstructed (server).
    pub inner_hello: Option<Vec<u8>>,
    /// Types compressed out of the inner and carried only by the outer.
    pub outer_only: Vec<ExtensionType>,
}

impl Default for EchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EchSession {
    pub fn new() -> Self {
        Self {
            state: EchState::NotTried,
            view: HelloView::Outer,
            backend: false,
            inner_name: None,
            outer_name: None,
            configs: None,
            session_id: Vec::new(),
            encoded_inner: None,
            inner_hello: None,
            outer_only: Vec::new(),
        }
    }

    /// A session driven by a front-end proxy rather than a full TLS
    /// stack.
    pub fn for_backend() -> Self {
        Self { backend: true, ..Self::new() }
    }

    /// The post-handshake status accessor.
    pub fn status(&self) -> EchState {
        self.state
    }

    pub fn view(&self) -> HelloView {
        self.view
    }

    pub fn is_backend(&self) -> bool {
        self.backend
    }

    /// Whether the state machine has reached a terminal state.
    pub fn is_done(&self) -> bool {
        !matches!(self.status(), EchState::NotTried | EchState::Attempted)
    }

    pub fn mark_attempted(&mut self) {
        self.transition(EchState::Attempted, &[EchState::NotTried]);
    }

    pub fn mark_grease(&mut self) {
        self.transition(EchState::Grease, &[EchState::Attempted]);
    }

    pub fn mark_success(&mut self) {
        self.transition(EchState::Success, &[EchState::Attempted]);
    }

    pub fn mark_failed(&mut self) {
        self.transition(EchState::Failed, &[EchState::Attempted]);
    }

    /// Applies the certificate-verification verdict to a successful
    /// handshake.
    pub fn certificate_verified(&mut self, ok: bool) {
        if !ok {
            self.transition(EchState::BadName, &[EchState::Success]);
        }
    }

    fn transition(&mut self, to: EchState, allowed_from: &[EchState]) {
        let from = self.status();
        if allowed_from.contains(&from) {
            debug!("ech state {:?} -> {:?}", from, to);
            self.state = to;
        } else {
            warn!("ignoring ech state change {:?} -> {:?}", from, to);
        }
    }

    /// The server-side swap: subsequent processing sees the inner as
    /// "the" ClientHello. Only the tag and the reconstruction products
    /// change; shared handles stay where they are.
    pub fn swap_to_inner(&mut self, inner_hello: Vec<u8>, outer_only: Vec<ExtensionType>) {
        debug!("swapping to the inner hello ({} bytes)", inner_hello.len());
        self.view = HelloView::Inner;
        self.inner_hello = Some(inner_hello);
        self.outer_only = outer_only;
    }
}
