use std::fmt;
use std::num::{ParseFloatError, ParseIntError};
use std::string::FromUtf8Error;

pub type Result<T> = std::result::Result<T, PDFError>;

/// Error taxonomy for the core. Every variant carries enough context to build
/// a human-readable message; callers that want to branch programmatically
/// match on the variant itself rather than parse the message.
#[derive(Debug)]
pub enum PDFError {
    /// Lexer/parser failure, bad xref, bad stream length. Carries the byte
    /// offset where the failure was detected.
    MalformedSource { offset: u64, message: String },
    /// A reference resolved to an empty or mistyped slot.
    BrokenReference { obj_num: u32, gen_num: u16 },
    /// Decode or encode failure in the filter pipeline.
    FilterError { filter: &'static str, message: String },
    /// Signature placeholder not found, or signature exceeds capacity.
    PlaceholderError {
        message: String,
        required: Option<usize>,
        available: Option<usize>,
    },
    /// Internal bug, e.g. attempting to write a free slot. Fatal.
    InvariantViolation(&'static str),
    /// Underlying I/O failure.
    Io(std::io::Error),
    /// A byte sequence that was expected to be valid UTF-8 was not.
    Utf8(FromUtf8Error),
    ParseInt(ParseIntError),
    ParseFloat(ParseFloatError),
    /// An unrecognised PDF version string, e.g. in the `%PDF-x.y` header.
    InvalidPDFVersion(String),
    /// A `/CreationDate` or `/ModDate` string that does not match `D:...`.
    IllegalDateFormat(String),
}

impl PDFError {
    pub(crate) fn malformed(offset: u64, message: impl Into<String>) -> Self {
        PDFError::MalformedSource { offset, message: message.into() }
    }

    pub(crate) fn filter(filter: &'static str, message: impl Into<String>) -> Self {
        PDFError::FilterError { filter, message: message.into() }
    }
}

impl fmt::Display for PDFError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PDFError::MalformedSource { offset, message } => {
                write!(f, "malformed PDF source at byte {}: {}", offset, message)
            }
            PDFError::BrokenReference { obj_num, gen_num } => {
                write!(f, "broken reference {} {} R", obj_num, gen_num)
            }
            PDFError::FilterError { filter, message } => {
                write!(f, "filter {} failed: {}", filter, message)
            }
            PDFError::PlaceholderError { message, required, available } => {
                write!(f, "{}", message)?;
                if let (Some(required), Some(available)) = (required, available) {
                    write!(f, " (required {} bytes, available {} bytes)", required, available)?;
                }
                Ok(())
            }
            PDFError::InvariantViolation(message) => write!(f, "invariant violation: {}", message),
            PDFError::Io(err) => write!(f, "io error: {}", err),
            PDFError::Utf8(err) => write!(f, "invalid utf-8: {}", err),
            PDFError::ParseInt(err) => write!(f, "invalid integer: {}", err),
            PDFError::ParseFloat(err) => write!(f, "invalid real number: {}", err),
            PDFError::InvalidPDFVersion(version) => write!(f, "invalid PDF version: {}", version),
            PDFError::IllegalDateFormat(text) => write!(f, "illegal PDF date format: {}", text),
        }
    }
}

impl std::error::Error for PDFError {}

impl From<std::io::Error> for PDFError {
    fn from(err: std::io::Error) -> Self {
        PDFError::Io(err)
    }
}

impl From<FromUtf8Error> for PDFError {
    fn from(err: FromUtf8Error) -> Self {
        PDFError::Utf8(err)
    }
}

impl From<ParseIntError> for PDFError {
    fn from(err: ParseIntError) -> Self {
        PDFError::ParseInt(err)
    }
}

impl From<ParseFloatError> for PDFError {
    fn from(err: ParseFloatError) -> Self {
        PDFError::ParseFloat(err)
    }
}
