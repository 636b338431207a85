use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A GET kept failing (network error or non-200) until the retry budget ran out.
    Transport {
        url: String,
        attempts: u32,
        status: Option<u16>,
    },
    Http(reqwest::Error),
    Authentication {
        reason: String,
        source: Option<Box<Error>>,
    },
    /// An authenticated call still failed after re-logging in on every attempt.
    Request { url: String, attempts: u32 },
    Decode(String),
    InvalidArgument(String),
    OperationFailed { code: String, response: String },
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport {
                url,
                attempts,
                status: Some(status),
            } => write!(
                f,
                "transport error: {url} failed after {attempts} attempts (last status {status})"
            ),
            Error::Transport { url, attempts, .. } => {
                write!(f, "transport error: {url} failed after {attempts} attempts")
            }
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Authentication { reason, .. } => write!(f, "authentication failed: {reason}"),
            Error::Request { url, attempts } => write!(
                f,
                "request error: {url} not accepted after {attempts} login attempts"
            ),
            Error::Decode(msg) => write!(f, "decode error: {msg}"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::OperationFailed { code, response } => {
                write!(f, "operation failed with code {code:?}: {response}")
            }
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Authentication {
                source: Some(e), ..
            } => Some(&**e),
            _ => None,
        }
    }
}

impl Error {
    pub(crate) fn authentication(reason: impl Into<String>) -> Self {
        Error::Authentication {
            reason: reason.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Decode(format!("malformed XML: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
