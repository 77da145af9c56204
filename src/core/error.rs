use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    /// On-disk data violates the format or one of its invariants
    Corruption,
    /// Operation the underlying structure cannot answer (e.g. ordinals on an FST index)
    Unsupported,
    InvalidArgument,
    InvalidState,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    /// Corruption error naming the file it was detected in
    pub fn corruption(message: impl fmt::Display, resource: &str) -> Self {
        Error {
            kind: ErrorKind::Corruption,
            context: format!("{} (resource={})", message, resource),
        }
    }

    pub fn unsupported(context: &str) -> Self {
        Error {
            kind: ErrorKind::Unsupported,
            context: context.to_string(),
        }
    }

    pub fn is_corruption(&self) -> bool {
        self.kind == ErrorKind::Corruption
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error {
            kind: ErrorKind::Internal,
            context: format!("FST error: {}", err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::InvalidArgument,
            context: format!("config parse error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs every close step, returns the first failure and logs the rest.
pub fn close_all(steps: Vec<(&str, Result<()>)>) -> Result<()> {
    let mut first: Option<Error> = None;
    for (name, result) in steps {
        if let Err(err) = result {
            if first.is_none() {
                first = Some(err);
            } else {
                log::warn!("suppressed error while closing {}: {}", name, err);
            }
        }
    }
    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
