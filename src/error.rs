//! Error types shared by the normalizer and the benchmark runner

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Source unreadable, destination unwritable, or malformed CSV
    #[error("i/o failed on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Database unreachable or authentication rejected
    #[error("connection failed: {0}")]
    Connection(String),

    /// Malformed SQL or a missing table/column
    #[error("query {query} failed: {message}")]
    Query { query: String, message: String },

    /// Run tag cannot be used as an output directory name
    #[error("invalid run tag {0:?}: use letters, digits, '_', '-' or '.'")]
    InvalidTag(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Error::Io {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn query(query: impl Into<String>, message: impl ToString) -> Self {
        Error::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }
}
