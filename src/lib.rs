//! A library for reading, manipulating, and writing PDF documents: the
//! in-memory object graph, lazy parsing from an existing file, in-place
//! mutation, and writing back either as a complete file or as an
//! incremental update that preserves the original prefix byte-for-byte.

mod binary;
mod bytes;
mod constants;
mod content;
mod date;
mod document;
mod encoding;
mod error;
mod filters;
mod lexer;
mod object_parser;
mod objects;
mod registry;
mod signature;
mod vpdf;
mod writer;
mod xref;

pub use content::{ContentStream, Op, Operand, Operator};
pub use date::Date;
pub use document::Document;
pub use error::{PDFError, Result};
pub use objects::{Dictionary, Name, PDFNumber, PDFObject, PDFString, Reference, Stream};
pub use signature::{
    byte_range_placeholder, byte_range_placeholder_object, contents_placeholder, contents_placeholder_object,
    contents_placeholder_width, sign_in_place, ByteRange,
};
pub use vpdf::PDFVersion;
pub use writer::WriteOptions;
