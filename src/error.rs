use std::fmt;
use std::path::PathBuf;

/// Errors raised by the documentation engine.
///
/// [`DocsError::MissingHost`] is the only error `ApiDocs::new` returns. The
/// other variants come from configuration loading and the individual
/// subsystems, where the engine logs them and carries on without that source.
#[derive(Debug)]
pub enum DocsError {
    /// The engine was constructed without a host application to inspect.
    MissingHost,
    /// A documentation artifact exists but could not be read.
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// A documentation artifact was read but is not a valid document.
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },
    /// Invalid configuration value.
    Config(String),
    /// The filesystem watcher could not be started.
    Watch(notify::Error),
}

impl fmt::Display for DocsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocsError::MissingHost => write!(
                f,
                "a host application is required to build API documentation"
            ),
            DocsError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            DocsError::Parse { path, message } => {
                write!(f, "failed to parse {}: {}", path.display(), message)
            }
            DocsError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            DocsError::Watch(e) => write!(f, "file watcher error: {e}"),
        }
    }
}

impl std::error::Error for DocsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocsError::Io { source, .. } => Some(source),
            DocsError::Watch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<notify::Error> for DocsError {
    fn from(err: notify::Error) -> Self {
        DocsError::Watch(err)
    }
}
