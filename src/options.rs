//! Command-line option parsing.

use std::ffi::OsStr;
use std::path::PathBuf;

use ech::HpkeSymmetricCipherSuite;

/// The command-line options used when running ech-tool.
#[derive(PartialEq, Debug)]
pub struct Options {

    /// Which of the tool’s jobs to do.
    pub mode: Mode,
}

/// The tool does one of three things per invocation.
#[derive(PartialEq, Debug)]
pub enum Mode {

    /// Decode a config list from a command-line value or an @file.
    Decode {
        input: String,
    },

    /// Load and describe a PEM key container.
    Inspect {
        path: PathBuf,
    },

    /// Emit a GREASE ECH extension body.
    Grease {
        suite: Option<HpkeSymmetricCipherSuite>,
    },
}

impl Options {

    /// Parses and interprets a set of options from the user’s
    /// command-line arguments.
    #[allow(unused_results)]
    pub fn getopts<C>(args: C) -> OptionsResult
    where C: IntoIterator,
          C::Item: AsRef<OsStr>,
    {
        let mut opts = getopts::Options::new();

        opts.optopt ("k", "keyfile",  "Inspect a PEM key container", "FILE");
        opts.optflag("g", "grease",   "Emit a GREASE ECH extension body");
        opts.optopt ("s", "suite",    "Pin the (kdf, aead) pair used for GREASE", "SUITE");

        // Meta options
        opts.optflag("V", "version",  "Print version information");
        opts.optflag("?", "help",     "Print list of command-line options");

        let matches = match opts.parse(args) {
            Ok(m)  => m,
            Err(e) => return OptionsResult::InvalidOptionsFormat(e),
        };

        if matches.opt_present("version") {
            OptionsResult::Version
        }
        else if matches.opt_present("help") {
            OptionsResult::Help(HelpReason::Flag)
        }
        else {
            match Self::deduce(matches) {
                Ok(Some(opts)) => OptionsResult::Ok(opts),
                Ok(None)       => OptionsResult::Help(HelpReason::NoInput),
                Err(e)         => OptionsResult::InvalidOptions(e),
            }
        }
    }

    fn deduce(matches: getopts::Matches) -> Result<Option<Self>, &'static str> {
        if matches.opt_present("grease") {
            let suite = match matches.opt_str("suite") {
                Some(text) => match text.parse() {
                    Ok(suite) => Some(suite),
                    Err(_)    => return Err("Invalid grease suite (try hkdf-sha256,aes-128-gcm)"),
                },
                None => None,
            };
            return Ok(Some(Self { mode: Mode::Grease { suite } }));
        }

        if let Some(path) = matches.opt_str("keyfile") {
            return Ok(Some(Self { mode: Mode::Inspect { path: PathBuf::from(path) } }));
        }

        match matches.free.as_slice() {
            []      => Ok(None),
            [input] => Ok(Some(Self { mode: Mode::Decode { input: input.clone() } })),
            _       => Err("Give exactly one config input (or use @FILE)"),
        }
    }
}

/// The result of the `getopts` function.
#[derive(PartialEq, Debug)]
pub enum OptionsResult {

    /// The options were parsed successfully.
    Ok(Options),

    /// There was an error (from `getopts`) parsing the arguments.
    InvalidOptionsFormat(getopts::Fail),

    /// There was an error with the combination of options the user
    /// selected.
    InvalidOptions(&'static str),

    /// Help was requested, either by flag or by not saying what to do.
    Help(HelpReason),

    /// The version was requested.
    Version,
}

/// The reason that help is being displayed. If it’s for the `--help`
/// flag, then we shouldn’t return an error exit status.
#[derive(PartialEq, Debug, Copy, Clone)]
pub enum HelpReason {

    /// Help was requested with the `--help` flag.
    Flag,

    /// There was nothing on the command line to act on.
    NoInput,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> OptionsResult {
        Options::getopts(args.iter())
    }

    #[test]
    fn no_arguments_asks_for_help() {
        assert_eq!(parse(&[]), OptionsResult::Help(HelpReason::NoInput));
    }

    #[test]
    fn help_flag() {
        assert_eq!(parse(&["--help"]), OptionsResult::Help(HelpReason::Flag));
    }

    #[test]
    fn version_flag() {
        assert_eq!(parse(&["-V"]), OptionsResult::Version);
    }

    #[test]
    fn a_config_input() {
        assert_eq!(parse(&["AEb+CgBC"]), OptionsResult::Ok(Options {
            mode: Mode::Decode { input: "AEb+CgBC".into() },
        }));
    }

    #[test]
    fn a_key_file() {
        assert_eq!(parse(&["--keyfile", "server.ech"]), OptionsResult::Ok(Options {
            mode: Mode::Inspect { path: PathBuf::from("server.ech") },
        }));
    }

    #[test]
    fn grease_with_a_pinned_suite() {
        let result = parse(&["--grease", "--suite", "hkdf-sha256,chacha20-poly1305"]);
        match result {
            OptionsResult::Ok(Options { mode: Mode::Grease { suite: Some(_) } }) => {},
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn grease_with_a_bad_suite() {
        assert!(matches!(
            parse(&["--grease", "--suite", "no-such-thing"]),
            OptionsResult::InvalidOptions(_),
        ));
    }

    #[test]
    fn too_many_inputs() {
        assert!(matches!(parse(&["one", "two"]), OptionsResult::InvalidOptions(_)));
    }
}
