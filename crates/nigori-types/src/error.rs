use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} too long: {len} bytes exceeds limit of {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
