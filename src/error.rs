//! Error types for the stats engine

use thiserror::Error;

/// Result type alias for stats engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the stats engine
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed stats clause. Carries the offending token so callers can
    /// point at the exact spot in the query.
    #[error("cannot parse stats pipe at token {token:?}: {msg}")]
    Parse { token: String, msg: String },

    /// The global state-size budget was drained before the query finished.
    #[error("cannot calculate [{pipe}]; requires more than {max_mib} MiB of memory")]
    BudgetExceeded { pipe: String, max_mib: i64 },
}

impl Error {
    pub(crate) fn parse(token: impl Into<String>, msg: impl Into<String>) -> Error {
        Error::Parse {
            token: token.into(),
            msg: msg.into(),
        }
    }
}
