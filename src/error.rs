use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    NotConnected,
    DuplicateZone(String),
    UnknownZone(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::NotConnected => write!(f, "not connected"),
            Error::DuplicateZone(uid) => write!(f, "zone already registered: {uid}"),
            Error::UnknownZone(uid) => write!(f, "unknown zone: {uid}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
