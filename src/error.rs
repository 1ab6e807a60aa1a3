//! Error handling for the crate.
//!
//! All fallible operations return the one [`Error`] type defined here. Its
//! variants separate malformed input from conflicts inside an otherwise
//! well-formed configuration and from request-level subject policy
//! violations, so callers can tell a broken deployment from a bad request.

use std::{error, fmt, io};
use std::path::{Path, PathBuf};
use openssl::error::ErrorStack;


//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    /// The caller handed in malformed input.
    ///
    /// This covers wrong value kinds in a document, missing required
    /// fields, and collaborators that are not registered.
    InvalidArgument(String),

    /// A value was of the wrong type where a profile was expected.
    TypeMismatch(String),

    /// The configuration is well-formed but contradicts itself.
    Config(String),

    /// A subject does not satisfy a profile’s subject item policy.
    PolicyViolation(String),

    /// Reading a file failed.
    Io {
        path: PathBuf,
        err: io::Error,
    },

    /// The cryptographic library rejected something.
    Crypto(ErrorStack),

    /// A configuration document could not be parsed.
    Parse(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn io(path: &Path, err: io::Error) -> Self {
        Error::Io { path: path.into(), err }
    }

    /// Returns whether this is a request-level policy violation.
    ///
    /// All other errors indicate an unusable configuration.
    pub fn is_policy_violation(&self) -> bool {
        matches!(*self, Error::PolicyViolation(_))
    }

    /// Returns whether the error was caused by malformed caller input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(*self, Error::InvalidArgument(_))
    }
}

impl From<ErrorStack> for Error {
    fn from(err: ErrorStack) -> Self {
        Error::Crypto(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidArgument(ref msg) => f.write_str(msg),
            Error::TypeMismatch(ref msg) => f.write_str(msg),
            Error::Config(ref msg) => f.write_str(msg),
            Error::PolicyViolation(ref msg) => f.write_str(msg),
            Error::Io { ref path, ref err } => {
                write!(f, "{}: {}", path.display(), err)
            }
            Error::Crypto(ref err) => write!(f, "{}", err),
            Error::Parse(ref msg) => {
                write!(f, "failed to parse configuration: {}", msg)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io { ref err, .. } => Some(err),
            Error::Crypto(ref err) => Some(err),
            _ => None
        }
    }
}


//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_passes_message_through() {
        assert_eq!(
            Error::config("unknown profile 'foo'").to_string(),
            "unknown profile 'foo'"
        );
        let err = Error::io(
            Path::new("/nowhere/ca.cer"),
            io::Error::new(io::ErrorKind::NotFound, "not found")
        );
        assert_eq!(err.to_string(), "/nowhere/ca.cer: not found");
    }

    #[test]
    fn classification() {
        assert!(Error::PolicyViolation("x".into()).is_policy_violation());
        assert!(!Error::config("x").is_policy_violation());
        assert!(Error::invalid("x").is_invalid_argument());
        assert!(!Error::TypeMismatch("x".into()).is_invalid_argument());
    }
}
