use std::fmt;

/// Reason reported to Alexa when nothing more specific is known.
pub(crate) const DEFAULT_REASON: &str = "OpenHAB error";

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Status(u16),
    Json(serde_json::Error),
    Io(std::io::Error),
    Config(String),
    MalformedEvent(String),
    UnsupportedDirective(String),
    /// Hub data missing or unusable; carries the reason shown to the caller.
    Unavailable(&'static str),
    NoItems,
}

impl Error {
    /// Free-text `dependentServiceName` used in the error envelope.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Unavailable(reason) => *reason,
            Error::MalformedEvent(_) => "Malformed request",
            _ => DEFAULT_REASON,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Status(code) => write!(f, "hub returned status {code}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::MalformedEvent(msg) => write!(f, "malformed event: {msg}"),
            Error::UnsupportedDirective(name) => write!(f, "unsupported directive: {name}"),
            Error::Unavailable(reason) => write!(f, "hub data unavailable: {reason}"),
            Error::NoItems => write!(f, "hub returned no items"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
