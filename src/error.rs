use thiserror::Error;

/// Errors from the validating entry points. The numeric core itself is total
/// and never returns one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no digits to convert")]
    EmptyDigits,

    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    #[error("exponent marker at offset {offset} is not followed by digits")]
    MissingExponent { offset: usize },

    #[error("{len} significant digits do not fit a DecimalDigits")]
    TooManyDigits { len: usize },

    #[error("unknown format style {0:?}")]
    UnknownStyle(String),
}

/// Result alias for the validating entry points.
pub type Result<T> = ::std::result::Result<T, Error>;
