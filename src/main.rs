//! ech-tool, a command-line ECH config and key inspector.

#![warn(deprecated_in_future)]
#![warn(future_incompatible)]
#![warn(nonstandard_style)]
#![warn(rust_2018_compatibility)]
#![warn(rust_2018_idioms)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused)]

#![deny(unsafe_code)]


use std::env;
use std::fs;
use std::process::exit;

use log::*;

use ech::grease::grease_ech_extension;
use ech::{EchConfigList, HpkeKemId};
use ech_keys::EchKeyStore;

mod options;
use self::options::*;

const USAGE: &str = "\
Usage: ech-tool [CONFIG | @FILE]
       ech-tool --keyfile FILE
       ech-tool --grease [--suite SUITE]

Decodes an ECHConfigList given as base64, ascii-hex, HTTPS/SVCB
presentation data containing an ech= parameter, or (with @FILE) any of
those plus raw binary read from a file.

Options:
  -k, --keyfile FILE   Inspect a PEM key container instead
  -g, --grease         Emit a GREASE ECH extension body as hex
  -s, --suite SUITE    Pin the GREASE (kdf, aead) pair, e.g.
                       hkdf-sha256,chacha20-poly1305
  -V, --version        Print version information
  -?, --help           Print this list of command-line options

Set ECH_DEBUG=1 for wire-level tracing.";

/// Configures logging, parses the command-line options, and handles
/// any errors before doing the actual work.
fn main() {
    configure_logger();

    match Options::getopts(env::args_os().skip(1)) {
        OptionsResult::Ok(options) => {
            info!("Running with options -> {:#?}", options);
            exit(run(options));
        }

        OptionsResult::Help(help_reason) => {
            println!("{}", USAGE);
            if help_reason == HelpReason::NoInput {
                exit(exits::OPTIONS_ERROR);
            }
            else {
                exit(exits::SUCCESS);
            }
        }

        OptionsResult::Version => {
            println!("ech-tool {}", env!("CARGO_PKG_VERSION"));
            exit(exits::SUCCESS);
        }

        OptionsResult::InvalidOptionsFormat(oe) => {
            eprintln!("Invalid options: {:?}", oe);
            exit(exits::OPTIONS_ERROR);
        }

        OptionsResult::InvalidOptions(why) => {
            eprintln!("{}", why);
            exit(exits::OPTIONS_ERROR);
        }
    }
}

/// Checks the `ECH_DEBUG` environment variable, enabling trace logging
/// if it’s non-empty.
fn configure_logger() {
    let present = match env::var_os("ECH_DEBUG") {
        Some(debug)  => debug.len() > 0,
        None         => false,
    };

    let mut logs = env_logger::Builder::new();
    if present {
        let _ = logs.filter(None, log::LevelFilter::Trace);
    }
    else {
        let _ = logs.filter(None, log::LevelFilter::Off);
    }

    logs.init()
}

fn run(options: Options) -> i32 {
    match options.mode {
        Mode::Decode { input } => decode(&input),
        Mode::Inspect { path } => inspect(&path),
        Mode::Grease { suite } => {
            match grease_ech_extension(HpkeKemId::DHKEM_X25519_HKDF_SHA256, suite) {
                Ok(body) => {
                    println!("{}", hex::encode(body));
                    exits::SUCCESS
                }
                Err(e) => {
                    eprintln!("Could not build a grease extension: {}", e);
                    exits::RUNTIME_ERROR
                }
            }
        }
    }
}

fn decode(input: &str) -> i32 {
    let bytes = if let Some(path) = input.strip_prefix('@') {
        match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Could not read {}: {}", path, e);
                return exits::RUNTIME_ERROR;
            }
        }
    }
    else {
        input.as_bytes().to_vec()
    };

    // a trailing newline would otherwise push text inputs to binary
    let trimmed: &[u8] = {
        let mut slice = &bytes[..];
        while let [rest @ .., last] = slice {
            if last.is_ascii_whitespace() { slice = rest; } else { break; }
        }
        slice
    };

    match EchConfigList::from_input(trimmed) {
        Ok(lists) => {
            for (l, list) in lists.iter().enumerate() {
                println!("list {} ({} bytes)", l, list.raw().len());
                for (c, config) in list.configs().iter().enumerate() {
                    println!("  config {}:", c);
                    println!("    version:      {:?}", config.version);
                    println!("    config_id:    {}", config.config_id);
                    println!("    kem:          {:?}", config.kem_id);
                    println!("    suites:       {:?}", config.cipher_suites);
                    println!("    public_name:  {}", config.public_name);
                    println!("    max_name_len: {}", config.maximum_name_length);
                    println!("    public_key:   {}", base64::encode(&config.public_key));
                    println!("    extensions:   {}", config.extensions.len());
                }
            }
            exits::SUCCESS
        }
        Err(e) => {
            eprintln!("Could not decode the input: {:?}", e);
            exits::RUNTIME_ERROR
        }
    }
}

fn inspect(path: &std::path::Path) -> i32 {
    let mut store = EchKeyStore::new();
    if let Err(e) = store.add_pem_file(path) {
        eprintln!("Could not load {:?}: {:?}", path, e);
        return exits::RUNTIME_ERROR;
    }

    for key in store.keys() {
        let config = key.config();
        println!("source:       {:?}", key.source());
        println!("config_id:    {}", config.config_id);
        println!("kem:          {:?}", config.kem_id);
        println!("suites:       {:?}", config.cipher_suites);
        println!("public_name:  {}", config.public_name);
        println!("public_key:   {}", base64::encode(&config.public_key));
    }
    exits::SUCCESS
}

mod exits {

    /// Exit code for when everything turns out OK.
    pub const SUCCESS: i32 = 0;

    /// Exit code for when the input or a key file could not be used.
    pub const RUNTIME_ERROR: i32 = 1;

    /// Exit code for when the command-line options are invalid.
    pub const OPTIONS_ERROR: i32 = 3;
}
